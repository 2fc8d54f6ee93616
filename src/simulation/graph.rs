use crate::common::StationId;
use crate::level::{Level, StationData};
use crate::simulation::sparse_vec::{Chunkable, SparseVec};
use bevy::prelude::*;

#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    /// Map coordinates, y grows downward.
    pub position: Vec2,
    connections: Vec<StationId>,
}

impl Station {
    pub fn new(id: StationId, name: impl Into<String>, position: Vec2, connections: Vec<StationId>) -> Self {
        Station {
            id,
            name: name.into(),
            position,
            connections,
        }
    }

    pub fn connections(&self) -> &[StationId] {
        &self.connections
    }
}

impl From<&StationData> for Station {
    fn from(value: &StationData) -> Self {
        Station::new(value.id, value.name.clone(), vec2(value.x, value.y), value.connections.clone())
    }
}

impl Chunkable for Station {
    fn get_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSegment {
    pub from: StationId,
    pub to: StationId,
    pub start: Vec2,
    pub end: Vec2,
}

/// Static station graph. Edges are directed as listed in each station's connections.
#[derive(Debug, Default)]
pub struct StationGraph {
    stations: SparseVec<Station>,
}

impl StationGraph {
    pub fn from_level(level: &Level) -> Self {
        level.stations.iter().map(Station::from).collect()
    }

    pub fn station(&self, id: StationId) -> &Station {
        self.stations.get(id).expect("station not found")
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.stations.contains(id)
    }

    pub fn neighbors(&self, id: StationId) -> &[StationId] {
        self.station(id).connections()
    }

    pub fn is_reachable(&self, from: StationId, to: StationId) -> bool {
        from != to && self.neighbors(from).contains(&to)
    }

    pub fn bearing(&self, from: StationId, to: StationId) -> f32 {
        let delta = self.station(to).position - self.station(from).position;
        delta.y.atan2(delta.x)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Station> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn tracks(&self) -> impl Iterator<Item = TrackSegment> + '_ {
        self.stations.iter().flat_map(move |station| {
            station
                .connections()
                .iter()
                .filter(move |&&to| to > station.id || !self.station(to).connections().contains(&station.id))
                .map(move |&to| TrackSegment {
                    from: station.id,
                    to,
                    start: station.position,
                    end: self.station(to).position,
                })
        })
    }
}

impl FromIterator<Station> for StationGraph {
    fn from_iter<I: IntoIterator<Item = Station>>(iter: I) -> Self {
        StationGraph {
            stations: iter.into_iter().collect(),
        }
    }
}
