use crate::common::{StationId, WagonId};
use crate::simulation::dispatch::{DropDecision, StationInfo};
use crate::simulation::engine::ShuntingError;
use bevy::prelude::*;

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuntingCommand {
    StationClicked(StationId),
    ConfirmMove,
    Disarm,
    WagonDropped { wagon_id: WagonId, decision: DropDecision },
    CoupleOffered(WagonId),
    LeaveOffered,
}

#[derive(Message, Debug, Clone, PartialEq)]
pub enum ShuntingOutcome {
    StationSelected { info: StationInfo, armed: bool },
    MoveStarted { from: StationId, to: StationId },
    Arrived { station_id: StationId },
    CouplingOffered { station_id: StationId },
    CouplingClosed { station_id: StationId },
    Coupled(WagonId),
    Decoupled { wagon_id: WagonId, station_id: StationId },
    Disarmed,
    Rejected(ShuntingError),
}

impl ShuntingOutcome {
    pub fn station_selected(info: StationInfo, armed: bool) -> Self {
        ShuntingOutcome::StationSelected { info, armed }
    }

    pub fn rejected(error: ShuntingError) -> Self {
        warn!("Rejected: {}", error);
        ShuntingOutcome::Rejected(error)
    }
}

pub struct MessagingPlugin;

impl Plugin for MessagingPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ShuntingCommand>().add_message::<ShuntingOutcome>();
    }
}
