use crate::common::{StationId, WagonId, WagonType};
use crate::level::Level;
use crate::simulation::graph::StationGraph;
use crate::simulation::sparse_vec::{Chunkable, SparseVec};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("wagon {0} is both in a station pool and attached to the locomotive")]
    Duplicated(WagonId),
    #[error("wagon {0} is neither in a station pool nor attached to the locomotive")]
    Lost(WagonId),
    #[error("wagon {wagon} rests in the pool of station {pool} but refers to station {station}")]
    WrongPool {
        wagon: WagonId,
        pool: StationId,
        station: StationId,
    },
    #[error("wagon {0} is listed more than once")]
    Repeated(WagonId),
    #[error("attachment flag of wagon {0} contradicts its container")]
    FlagMismatch(WagonId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wagon {
    pub id: WagonId,
    pub wagon_type: WagonType,
    station_id: StationId,
    attached: bool,
}

impl Wagon {
    pub fn new(id: WagonId, wagon_type: WagonType, station_id: StationId) -> Self {
        Wagon {
            id,
            wagon_type,
            station_id,
            attached: false,
        }
    }

    /// The pool station for a resting wagon, or the last station the train stopped at.
    pub fn station_id(&self) -> StationId {
        self.station_id
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Chunkable for Wagon {
    fn get_id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locomotive {
    station_id: StationId,
    orientation: f32,
}

/// Authoritative shunting state. Mutated only by the transition engine.
#[derive(Debug)]
pub struct ConsistModel {
    locomotive: Locomotive,
    wagons: SparseVec<Wagon>,
    attached: Vec<WagonId>,
    pools: HashMap<StationId, Vec<WagonId>>,
}

impl ConsistModel {
    /// Builds the model with every wagon resting in the pool of its station.
    pub fn new<I>(graph: &StationGraph, locomotive_station: StationId, wagons: I) -> Self
    where
        I: IntoIterator<Item = Wagon>,
    {
        assert!(graph.contains(locomotive_station), "locomotive station not found");
        let wagons: SparseVec<Wagon> = wagons.into_iter().collect();
        let mut pools: HashMap<StationId, Vec<WagonId>> = graph.iter().map(|s| (s.id, Vec::new())).collect();
        for wagon in &wagons {
            pools
                .get_mut(&wagon.station_id)
                .expect("wagon placed at unknown station")
                .push(wagon.id);
        }

        ConsistModel {
            locomotive: Locomotive {
                station_id: locomotive_station,
                orientation: 0.0,
            },
            wagons,
            attached: Vec::new(),
            pools,
        }
    }

    pub fn from_level(level: &Level, graph: &StationGraph, locomotive_station: StationId) -> Self {
        let wagons = level
            .stations
            .iter()
            .flat_map(|station| station.wagons.iter().map(move |&wagon_type| (station.id, wagon_type)))
            .zip(1..)
            .map(|((station_id, wagon_type), id)| Wagon::new(id, wagon_type, station_id));
        Self::new(graph, locomotive_station, wagons)
    }

    pub fn locomotive_station(&self) -> StationId {
        self.locomotive.station_id
    }

    pub fn locomotive_orientation(&self) -> f32 {
        self.locomotive.orientation
    }

    pub fn wagon(&self, id: WagonId) -> &Wagon {
        self.wagons.get(id).expect("wagon not found")
    }

    pub fn wagons(&self) -> impl Iterator<Item = &Wagon> {
        self.wagons.iter()
    }

    pub fn wagons_at(&self, station_id: StationId) -> impl Iterator<Item = &Wagon> {
        self.pool(station_id).iter().map(|&id| self.wagon(id))
    }

    pub fn pool(&self, station_id: StationId) -> &[WagonId] {
        self.pools.get(&station_id).expect("station not found")
    }

    pub fn attached_wagons(&self) -> impl Iterator<Item = &Wagon> {
        self.attached.iter().map(|&id| self.wagon(id))
    }

    pub fn attached_ids(&self) -> &[WagonId] {
        &self.attached
    }

    pub(super) fn place_locomotive(&mut self, station_id: StationId) {
        self.locomotive.station_id = station_id;
    }

    pub(super) fn orient_locomotive(&mut self, orientation: f32) {
        self.locomotive.orientation = orientation;
    }

    pub(super) fn couple(&mut self, id: WagonId) {
        let wagon = self.wagons.get_mut(id).expect("wagon not found");
        let pool = self.pools.get_mut(&wagon.station_id).expect("station not found");
        let index = pool.iter().position(|&x| x == id).expect("wagon missing from its pool");
        pool.remove(index);
        wagon.attached = true;
        self.attached.push(id);
    }

    /// Moves an attached wagon into the pool of `station_id`; the cars behind it close rank.
    pub(super) fn uncouple(&mut self, id: WagonId, station_id: StationId) {
        let index = self
            .attached
            .iter()
            .position(|&x| x == id)
            .expect("wagon is not attached");
        self.attached.remove(index);
        let wagon = self.wagons.get_mut(id).expect("wagon not found");
        wagon.attached = false;
        wagon.station_id = station_id;
        self.pools.get_mut(&station_id).expect("station not found").push(id);
    }

    pub(super) fn relocate_attached(&mut self, station_id: StationId) {
        for &id in &self.attached {
            self.wagons.get_mut(id).expect("wagon not found").station_id = station_id;
        }
    }

    /// Every wagon is either in exactly one pool (its own station's) or attached, never both.
    pub fn verify_membership(&self) -> Result<(), MembershipError> {
        let mut seen: HashMap<WagonId, bool> = HashMap::with_capacity(self.wagons.len());
        for (&pool, ids) in &self.pools {
            for &id in ids {
                if seen.insert(id, false).is_some() {
                    return Err(MembershipError::Repeated(id));
                }
                let wagon = self.wagon(id);
                if wagon.station_id != pool {
                    return Err(MembershipError::WrongPool {
                        wagon: id,
                        pool,
                        station: wagon.station_id,
                    });
                }
                if wagon.attached {
                    return Err(MembershipError::FlagMismatch(id));
                }
            }
        }
        for &id in &self.attached {
            match seen.insert(id, true) {
                Some(false) => return Err(MembershipError::Duplicated(id)),
                Some(true) => return Err(MembershipError::Repeated(id)),
                None => {}
            }
            if !self.wagon(id).attached {
                return Err(MembershipError::FlagMismatch(id));
            }
        }
        match self.wagons.iter().find(|w| !seen.contains_key(&w.id)) {
            Some(lost) => Err(MembershipError::Lost(lost.id)),
            None => Ok(()),
        }
    }
}
