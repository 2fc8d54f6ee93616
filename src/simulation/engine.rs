use crate::common::{StationId, WagonId};
use crate::simulation::consist::ConsistModel;
use crate::simulation::graph::StationGraph;
use bevy::prelude::*;
use thiserror::Error;

/// Rejected user operations. None of them change the shunting state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ShuntingError {
    #[error("station {to} cannot be reached from station {from}")]
    UnreachableStation { from: StationId, to: StationId },
    #[error("locomotive is busy moving to station {0}")]
    EngineBusy(StationId),
    #[error("wagon {wagon} rests at station {station}, locomotive is at station {locomotive}")]
    WagonNotAtLocomotiveStation {
        wagon: WagonId,
        station: StationId,
        locomotive: StationId,
    },
    #[error("wagon {0} is not attached to the locomotive")]
    WagonNotAttached(WagonId),
    #[error("wagon {0} is already attached to the locomotive")]
    WagonAlreadyAttached(WagonId),
    #[error("no move is armed")]
    NoMoveArmed,
    #[error("no coupling choice is offered")]
    NoCouplingOffer,
}

pub type ShuntingResult<T> = Result<T, ShuntingError>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Idle { station_id: StationId },
    Moving { from: StationId, to: StationId, progress: f32 },
}

impl MotionState {
    pub fn is_moving(&self) -> bool {
        matches!(self, MotionState::Moving { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveStarted {
    pub from: StationId,
    pub to: StationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub station_id: StationId,
    pub wagons_available: usize,
}

#[derive(Debug)]
pub struct TransitionEngine {
    graph: StationGraph,
    consist: ConsistModel,
    state: MotionState,
}

impl TransitionEngine {
    pub fn new(graph: StationGraph, consist: ConsistModel) -> Self {
        let station_id = consist.locomotive_station();
        TransitionEngine {
            graph,
            consist,
            state: MotionState::Idle { station_id },
        }
    }

    pub fn graph(&self) -> &StationGraph {
        &self.graph
    }

    pub fn consist(&self) -> &ConsistModel {
        &self.consist
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    fn idle_station(&self) -> ShuntingResult<StationId> {
        match self.state {
            MotionState::Idle { station_id } => Ok(station_id),
            MotionState::Moving { to, .. } => Err(ShuntingError::EngineBusy(to)),
        }
    }

    pub fn request_move(&mut self, to: StationId) -> ShuntingResult<MoveStarted> {
        let from = self.idle_station()?;
        // unknown ids are a data error, not a rejected gesture
        self.graph.station(to);
        if !self.graph.is_reachable(from, to) {
            return Err(ShuntingError::UnreachableStation { from, to });
        }

        self.consist.orient_locomotive(self.graph.bearing(from, to));
        self.state = MotionState::Moving { from, to, progress: 0.0 };
        debug!("Locomotive departs {} -> {}", from, to);
        Ok(MoveStarted { from, to })
    }

    pub fn advance_move(&mut self, delta: f32) -> Option<Arrival> {
        let MotionState::Moving { from, to, progress } = self.state else {
            return None;
        };

        let progress = (progress + delta.max(0.0)).min(1.0);
        self.state = MotionState::Moving { from, to, progress };
        if progress >= 1.0 { Some(self.complete_move()) } else { None }
    }

    fn complete_move(&mut self) -> Arrival {
        let MotionState::Moving { to, .. } = self.state else {
            unreachable!("complete_move called while idle");
        };

        self.consist.place_locomotive(to);
        self.consist.relocate_attached(to);
        self.state = MotionState::Idle { station_id: to };
        self.check_membership();

        let wagons_available = self.consist.pool(to).len();
        debug!("Locomotive arrived at {}, {} wagons waiting", to, wagons_available);
        Arrival {
            station_id: to,
            wagons_available,
        }
    }

    pub fn attach_wagon(&mut self, wagon_id: WagonId) -> ShuntingResult<()> {
        let locomotive = self.idle_station()?;
        let wagon = self.consist.wagon(wagon_id);
        if wagon.is_attached() {
            return Err(ShuntingError::WagonAlreadyAttached(wagon_id));
        }
        if wagon.station_id() != locomotive {
            return Err(ShuntingError::WagonNotAtLocomotiveStation {
                wagon: wagon_id,
                station: wagon.station_id(),
                locomotive,
            });
        }

        self.consist.couple(wagon_id);
        self.check_membership();
        debug!("Wagon {} coupled at {}", wagon_id, locomotive);
        Ok(())
    }

    /// Leaves an attached wagon at the locomotive's current station.
    pub fn detach_wagon(&mut self, wagon_id: WagonId) -> ShuntingResult<()> {
        let locomotive = self.idle_station()?;
        if !self.consist.wagon(wagon_id).is_attached() {
            return Err(ShuntingError::WagonNotAttached(wagon_id));
        }

        self.consist.uncouple(wagon_id, locomotive);
        self.check_membership();
        debug!("Wagon {} decoupled at {}", wagon_id, locomotive);
        Ok(())
    }

    fn check_membership(&self) {
        let result = self.consist.verify_membership();
        debug_assert!(result.is_ok(), "consist integrity violated: {:?}", result);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::simulation::consist::tests::build_consist;
    use crate::simulation::graph::tests::build_graph;
    use itertools::Itertools;

    pub fn build_engine() -> TransitionEngine {
        let graph = build_graph();
        let consist = build_consist(&graph);
        TransitionEngine::new(graph, consist)
    }

    fn drive(engine: &mut TransitionEngine, to: StationId) -> Arrival {
        engine.request_move(to).unwrap();
        engine.advance_move(1.0).expect("move completes")
    }

    #[test]
    fn test_move_succeeds_only_to_neighbors() {
        let ids = build_graph().iter().map(|s| s.id).collect_vec();
        for from in ids.iter().copied() {
            for to in ids.iter().copied() {
                let mut engine = build_engine();
                // place the locomotive at `from` directly
                engine.consist.place_locomotive(from);
                engine.state = MotionState::Idle { station_id: from };

                let result = engine.request_move(to);
                let expected = engine.graph().is_reachable(from, to);
                assert_eq!(result.is_ok(), expected, "{} -> {}", from, to);
                if !expected {
                    assert_eq!(result, Err(ShuntingError::UnreachableStation { from, to }));
                    assert_eq!(engine.state(), MotionState::Idle { station_id: from });
                }
            }
        }
    }

    #[test]
    fn test_line_scenario() {
        let mut engine = build_engine();
        let arrival = drive(&mut engine, 2);
        assert_eq!(arrival.station_id, 2);
        assert_eq!(engine.consist().locomotive_station(), 2);

        assert_eq!(
            engine.request_move(3),
            Err(ShuntingError::UnreachableStation { from: 2, to: 3 })
        );
        assert_eq!(engine.consist().locomotive_station(), 2);
        assert_eq!(engine.state(), MotionState::Idle { station_id: 2 });
    }

    #[test]
    fn test_single_flight_movement() {
        let mut engine = build_engine();
        engine.request_move(2).unwrap();
        assert_eq!(engine.request_move(1), Err(ShuntingError::EngineBusy(2)));
        assert_eq!(
            engine.state(),
            MotionState::Moving {
                from: 1,
                to: 2,
                progress: 0.0
            }
        );

        assert!(engine.advance_move(0.4).is_none());
        assert!(engine.advance_move(0.4).is_none());
        assert_eq!(engine.request_move(1), Err(ShuntingError::EngineBusy(2)));
        let arrival = engine.advance_move(0.4).unwrap();
        assert_eq!(arrival.station_id, 2);
        assert_eq!(engine.state(), MotionState::Idle { station_id: 2 });
    }

    #[test]
    fn test_advance_while_idle_is_noop() {
        let mut engine = build_engine();
        assert!(engine.advance_move(1.0).is_none());
        assert_eq!(engine.state(), MotionState::Idle { station_id: 1 });
    }

    #[test]
    fn test_orientation_snaps_at_departure() {
        let mut engine = build_engine();
        engine.request_move(2).unwrap();
        assert_eq!(engine.consist().locomotive_orientation(), 0.0);
        drive_from_current(&mut engine);
        engine.request_move(4).unwrap();
        let bearing = engine.graph().bearing(2, 4);
        assert_eq!(engine.consist().locomotive_orientation(), bearing);
        engine.advance_move(0.5);
        assert_eq!(engine.consist().locomotive_orientation(), bearing);
    }

    fn drive_from_current(engine: &mut TransitionEngine) {
        engine.advance_move(1.0).expect("move completes");
    }

    #[test]
    fn test_attach_only_at_locomotive_station() {
        let mut engine = build_engine();
        assert_eq!(
            engine.attach_wagon(1),
            Err(ShuntingError::WagonNotAtLocomotiveStation {
                wagon: 1,
                station: 2,
                locomotive: 1
            })
        );
        assert_eq!(engine.consist().pool(2), &[1, 2]);
        assert_eq!(engine.consist().attached_wagons().count(), 0);

        let arrival = drive(&mut engine, 2);
        assert_eq!(arrival.wagons_available, 2);
        engine.attach_wagon(1).unwrap();
        assert_eq!(engine.consist().attached_ids(), &[1]);
        assert_eq!(engine.consist().pool(2).len(), 1);
        assert_eq!(engine.attach_wagon(1), Err(ShuntingError::WagonAlreadyAttached(1)));
        assert_eq!(engine.consist().verify_membership(), Ok(()));
    }

    #[test]
    fn test_attach_appends_to_tail() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        engine.attach_wagon(2).unwrap();
        engine.attach_wagon(1).unwrap();
        assert_eq!(engine.consist().attached_ids(), &[2, 1]);
    }

    #[test]
    fn test_arrival_updates_attached_wagons() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        engine.attach_wagon(1).unwrap();
        engine.attach_wagon(2).unwrap();
        drive(&mut engine, 4);
        assert_eq!(engine.consist().locomotive_station(), 4);
        for wagon in engine.consist().attached_wagons() {
            assert_eq!(wagon.station_id(), 4);
        }
        assert_eq!(engine.consist().verify_membership(), Ok(()));
    }

    #[test]
    fn test_detach_places_wagon_at_current_station() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        engine.attach_wagon(1).unwrap();
        drive(&mut engine, 4);
        drive(&mut engine, 5);

        engine.detach_wagon(1).unwrap();
        assert_eq!(engine.consist().pool(5), &[4, 1]);
        assert_eq!(engine.consist().pool(2), &[2]);
        assert_eq!(engine.consist().wagon(1).station_id(), 5);
        assert_eq!(engine.consist().verify_membership(), Ok(()));
    }

    #[test]
    fn test_detach_closes_rank() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        engine.attach_wagon(1).unwrap();
        engine.attach_wagon(2).unwrap();
        drive(&mut engine, 4);
        engine.attach_wagon(3).unwrap();

        engine.detach_wagon(2).unwrap();
        assert_eq!(engine.consist().attached_ids(), &[1, 3]);
        assert_eq!(engine.detach_wagon(2), Err(ShuntingError::WagonNotAttached(2)));
    }

    #[test]
    fn test_attach_then_detach_restores_pool() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        let before = engine.consist().pool(2).to_vec();
        engine.attach_wagon(1).unwrap();
        engine.detach_wagon(1).unwrap();
        assert_eq!(engine.consist().attached_wagons().count(), 0);
        assert_eq!(engine.consist().pool(2).len(), before.len());
        assert!(engine.consist().pool(2).contains(&1));
        assert_eq!(engine.consist().wagon(1).station_id(), 2);
    }

    #[test]
    fn test_coupling_rejected_while_moving() {
        let mut engine = build_engine();
        drive(&mut engine, 2);
        engine.attach_wagon(1).unwrap();
        engine.request_move(1).unwrap();

        assert_eq!(engine.attach_wagon(2), Err(ShuntingError::EngineBusy(1)));
        assert_eq!(engine.detach_wagon(1), Err(ShuntingError::EngineBusy(1)));
        assert_eq!(engine.consist().attached_ids(), &[1]);
        assert_eq!(engine.consist().pool(2), &[2]);
    }

    #[test]
    #[should_panic(expected = "station not found")]
    fn test_unknown_station_is_fatal() {
        let _ = build_engine().request_move(99);
    }

    #[test]
    #[should_panic(expected = "wagon not found")]
    fn test_unknown_wagon_is_fatal() {
        let _ = build_engine().attach_wagon(99);
    }
}
