use crate::common::{StationId, WagonId};
use crate::level::ShuntingSettings;
use crate::simulation::consist::ConsistModel;
use crate::simulation::engine::MotionState;
use crate::simulation::graph::StationGraph;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSettings {
    pub wagon_spacing: f32,
    pub pool_offset: Vec2,
    pub pool_step: Vec2,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        (&ShuntingSettings::default()).into()
    }
}

impl From<&ShuntingSettings> for LayoutSettings {
    fn from(value: &ShuntingSettings) -> Self {
        LayoutSettings {
            wagon_spacing: value.wagon_spacing,
            pool_offset: Vec2::from_array(value.pool_offset),
            pool_step: Vec2::from_array(value.pool_step),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsistLayout {
    pub locomotive_position: Vec2,
    pub orientation: f32,
    pub wagon_positions: Vec<(WagonId, Vec2)>,
}

pub fn project(
    graph: &StationGraph,
    consist: &ConsistModel,
    state: MotionState,
    settings: &LayoutSettings,
) -> ConsistLayout {
    let orientation = consist.locomotive_orientation();
    let locomotive_position = match state {
        MotionState::Idle { station_id } => graph.station(station_id).position,
        MotionState::Moving { from, to, progress } => graph
            .station(from)
            .position
            .lerp(graph.station(to).position, progress.clamp(0.0, 1.0)),
    };

    let heading = Vec2::from_angle(orientation);
    let wagon_positions = consist
        .attached_ids()
        .iter()
        .enumerate()
        .map(|(index, &id)| {
            let distance = settings.wagon_spacing * (index + 1) as f32;
            (id, locomotive_position - heading * distance)
        })
        .collect();

    ConsistLayout {
        locomotive_position,
        orientation,
        wagon_positions,
    }
}

pub fn pool_positions(
    graph: &StationGraph,
    consist: &ConsistModel,
    station_id: StationId,
    settings: &LayoutSettings,
) -> Vec<(WagonId, Vec2)> {
    let origin = graph.station(station_id).position + settings.pool_offset;
    consist
        .pool(station_id)
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, origin + settings.pool_step * index as f32))
        .collect()
}
