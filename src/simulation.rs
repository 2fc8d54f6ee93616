pub mod consist;
pub mod dispatch;
pub mod engine;
pub mod graph;
pub mod layout;
pub mod messages;
pub mod sparse_vec;

use crate::assets::{AssetHandles, LoadingState};
use crate::level::Level;
use crate::simulation::dispatch::{Dispatcher, DropDecision};
use crate::simulation::messages::{MessagingPlugin, ShuntingCommand, ShuntingOutcome};
use bevy::prelude::*;

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(MessagingPlugin)
            .add_systems(OnEnter(LoadingState::Loaded), setup)
            .add_systems(
                Update,
                (process_commands, advance)
                    .chain()
                    .run_if(resource_exists::<Dispatcher>),
            );
    }
}

fn setup(handles: Res<AssetHandles>, levels: Res<Assets<Level>>, mut commands: Commands) {
    let level = levels.get(&handles.level).expect("level had been loaded");
    match Dispatcher::from_level(level) {
        Ok(dispatcher) => {
            info!(
                "Shunting started with {} stations and {} wagons",
                dispatcher.engine().graph().len(),
                dispatcher.engine().consist().wagons().count()
            );
            commands.insert_resource(dispatcher);
        }
        Err(err) => error!("Level rejected: {}", err),
    }
}

fn process_commands(
    mut dispatcher: ResMut<Dispatcher>,
    mut commands: MessageReader<ShuntingCommand>,
    mut outcomes: MessageWriter<ShuntingOutcome>,
) {
    for command in commands.read() {
        let offer = dispatcher.coupling_offer();
        let outcome = match *command {
            ShuntingCommand::StationClicked(station_id) => {
                let click = dispatcher.on_station_clicked(station_id);
                Some(ShuntingOutcome::station_selected(click.info, click.armed.is_ok()))
            }
            ShuntingCommand::ConfirmMove => match dispatcher.on_confirm_move() {
                Ok(started) => {
                    info!("Locomotive departs from station {} to {}", started.from, started.to);
                    Some(ShuntingOutcome::MoveStarted {
                        from: started.from,
                        to: started.to,
                    })
                }
                Err(err) => Some(ShuntingOutcome::rejected(err)),
            },
            ShuntingCommand::Disarm => {
                dispatcher.disarm();
                Some(ShuntingOutcome::Disarmed)
            }
            ShuntingCommand::WagonDropped { wagon_id, decision } => {
                match dispatcher.on_wagon_drag_end(wagon_id, decision) {
                    Ok(()) => match decision {
                        DropDecision::Couple => Some(ShuntingOutcome::Coupled(wagon_id)),
                        DropDecision::Decouple => Some(ShuntingOutcome::Decoupled {
                            wagon_id,
                            station_id: dispatcher.engine().consist().locomotive_station(),
                        }),
                        DropDecision::Return => None,
                    },
                    Err(err) => Some(ShuntingOutcome::rejected(err)),
                }
            }
            ShuntingCommand::CoupleOffered(wagon_id) => match dispatcher.couple_offered(wagon_id) {
                Ok(()) => Some(ShuntingOutcome::Coupled(wagon_id)),
                Err(err) => Some(ShuntingOutcome::rejected(err)),
            },
            ShuntingCommand::LeaveOffered => match dispatcher.leave_offered() {
                Ok(station_id) => {
                    info!("Wagons left at station {}", station_id);
                    None
                }
                Err(err) => Some(ShuntingOutcome::rejected(err)),
            },
        };

        if let Some(outcome) = outcome {
            outcomes.write(outcome);
        }
        if let Some(station_id) = offer
            && dispatcher.coupling_offer().is_none()
        {
            outcomes.write(ShuntingOutcome::CouplingClosed { station_id });
        }
    }
}

fn advance(time: Res<Time>, mut dispatcher: ResMut<Dispatcher>, mut outcomes: MessageWriter<ShuntingOutcome>) {
    if !dispatcher.engine().state().is_moving() {
        return;
    }

    if let Some(outcome) = dispatcher.tick(time.delta_secs()) {
        let station_id = outcome.arrival.station_id;
        info!(
            "Locomotive arrived at {} with {} wagons attached",
            dispatcher.engine().graph().station(station_id).name,
            dispatcher.engine().consist().attached_ids().len()
        );
        outcomes.write(ShuntingOutcome::Arrived { station_id });
        if outcome.coupling_offered {
            outcomes.write(ShuntingOutcome::CouplingOffered { station_id });
        }
    }
}
