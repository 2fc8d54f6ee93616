use crate::common::{StationId, WagonId, WagonType};
use crate::level::{Level, LevelError, ShuntingSettings};
use crate::simulation::consist::{ConsistModel, Wagon};
use crate::simulation::engine::{Arrival, MotionState, MoveStarted, ShuntingError, ShuntingResult, TransitionEngine};
use crate::simulation::graph::{StationGraph, TrackSegment};
use crate::simulation::layout::{LayoutSettings, pool_positions, project};
use arrayvec::ArrayVec;
use bevy::prelude::*;
use itertools::Itertools;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropDecision {
    Couple,
    Decouple,
    Return,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WagonCounts(ArrayVec<(WagonType, usize), { WagonType::ALL.len() }>);

impl WagonCounts {
    pub fn from_wagons<'a, I: IntoIterator<Item = &'a Wagon>>(wagons: I) -> Self {
        let counts = wagons.into_iter().map(|w| w.wagon_type).counts();
        WagonCounts(
            WagonType::ALL
                .iter()
                .map(|t| (*t, counts.get(t).copied().unwrap_or(0)))
                .collect(),
        )
    }

    pub fn get(&self, wagon_type: WagonType) -> usize {
        self.0
            .iter()
            .find(|(t, _)| *t == wagon_type)
            .map_or(0, |(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationInfo {
    pub id: StationId,
    pub name: String,
    pub has_locomotive: bool,
    pub reachable: bool,
    pub wagons: WagonCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationClick {
    pub info: StationInfo,
    /// Whether a move to the clicked station is now waiting for confirmation.
    pub armed: ShuntingResult<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub arrival: Arrival,
    pub coupling_offered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationView {
    pub id: StationId,
    pub name: String,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocomotiveView {
    pub station_id: StationId,
    pub position: Vec2,
    pub orientation: f32,
    pub moving: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WagonView {
    pub id: WagonId,
    pub wagon_type: WagonType,
    pub position: Vec2,
    pub orientation: f32,
    pub attached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub stations: Vec<StationView>,
    pub tracks: Vec<TrackSegment>,
    pub locomotive: LocomotiveView,
    pub attached_wagons: Vec<WagonView>,
    pub station_pools: Vec<(StationId, Vec<WagonView>)>,
    pub armed: Option<StationId>,
    pub coupling_offer: Option<StationId>,
}

impl RenderState {
    pub fn wagons(&self) -> impl Iterator<Item = &WagonView> {
        self.attached_wagons
            .iter()
            .chain(self.station_pools.iter().flat_map(|(_, pool)| pool.iter()))
    }
}

/// Entry point for the UI: turns gestures into engine operations and keeps gesture state
/// (armed move, selected station, pending coupling choice).
#[derive(Resource, Debug)]
pub struct Dispatcher {
    engine: TransitionEngine,
    settings: ShuntingSettings,
    layout: LayoutSettings,
    selected: Option<StationId>,
    armed: Option<StationId>,
    coupling_offer: Option<StationId>,
}

impl Dispatcher {
    pub fn new(engine: TransitionEngine, settings: &ShuntingSettings) -> Self {
        Dispatcher {
            engine,
            settings: *settings,
            layout: settings.into(),
            selected: None,
            armed: None,
            coupling_offer: None,
        }
    }

    pub fn from_level(level: &Level) -> Result<Self, LevelError> {
        let locomotive_station = level.locomotive_station()?;
        let graph = StationGraph::from_level(level);
        let consist = ConsistModel::from_level(level, &graph, locomotive_station);
        Ok(Self::new(TransitionEngine::new(graph, consist), &level.settings))
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn settings(&self) -> &ShuntingSettings {
        &self.settings
    }

    pub fn selected(&self) -> Option<StationId> {
        self.selected
    }

    pub fn armed(&self) -> Option<StationId> {
        self.armed
    }

    pub fn coupling_offer(&self) -> Option<StationId> {
        self.coupling_offer
    }

    pub fn station_info(&self, station_id: StationId) -> StationInfo {
        let station = self.engine.graph().station(station_id);
        let consist = self.engine.consist();
        let reachable = match self.engine.state() {
            MotionState::Idle { station_id: from } => self.engine.graph().is_reachable(from, station_id),
            MotionState::Moving { .. } => false,
        };
        StationInfo {
            id: station_id,
            name: station.name.clone(),
            has_locomotive: !self.engine.state().is_moving() && consist.locomotive_station() == station_id,
            reachable,
            wagons: WagonCounts::from_wagons(consist.wagons_at(station_id)),
        }
    }

    pub fn train_counts(&self) -> WagonCounts {
        WagonCounts::from_wagons(self.engine.consist().attached_wagons())
    }

    pub fn on_station_clicked(&mut self, station_id: StationId) -> StationClick {
        let info = self.station_info(station_id);
        self.selected = Some(station_id);

        let armed = match self.engine.state() {
            MotionState::Moving { to, .. } => Err(ShuntingError::EngineBusy(to)),
            MotionState::Idle { station_id: from } if info.reachable => {
                debug!("Move {} -> {} armed", from, station_id);
                Ok(())
            }
            MotionState::Idle { station_id: from } => Err(ShuntingError::UnreachableStation { from, to: station_id }),
        };
        self.armed = armed.ok().map(|_| station_id);
        StationClick { info, armed }
    }

    pub fn on_confirm_move(&mut self) -> ShuntingResult<MoveStarted> {
        let to = self.armed.take().ok_or(ShuntingError::NoMoveArmed)?;
        let started = self.engine.request_move(to)?;
        self.coupling_offer = None;
        Ok(started)
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn on_wagon_drag_end(&mut self, wagon_id: WagonId, decision: DropDecision) -> ShuntingResult<()> {
        match decision {
            DropDecision::Couple => {
                self.engine.attach_wagon(wagon_id)?;
                self.refresh_offer();
            }
            DropDecision::Decouple => self.engine.detach_wagon(wagon_id)?,
            DropDecision::Return => {}
        }
        Ok(())
    }

    /// Couples a wagon picked from the coupling choice. The choice stays open while wagons remain.
    pub fn couple_offered(&mut self, wagon_id: WagonId) -> ShuntingResult<()> {
        if self.coupling_offer.is_none() {
            return Err(ShuntingError::NoCouplingOffer);
        }
        self.engine.attach_wagon(wagon_id)?;
        self.refresh_offer();
        Ok(())
    }

    pub fn leave_offered(&mut self) -> ShuntingResult<StationId> {
        self.coupling_offer.take().ok_or(ShuntingError::NoCouplingOffer)
    }

    fn refresh_offer(&mut self) {
        if let Some(station_id) = self.coupling_offer
            && self.engine.consist().pool(station_id).is_empty()
        {
            self.coupling_offer = None;
        }
    }

    pub fn tick(&mut self, dt: f32) -> Option<TickOutcome> {
        let arrival = self.engine.advance_move(dt / self.settings.move_duration_s)?;
        let coupling_offered = arrival.wagons_available > 0 && self.coupling_offer.is_none();
        if coupling_offered {
            self.coupling_offer = Some(arrival.station_id);
        }
        Some(TickOutcome {
            arrival,
            coupling_offered,
        })
    }

    pub fn render_state(&self) -> RenderState {
        let graph = self.engine.graph();
        let consist = self.engine.consist();
        let state = self.engine.state();
        let layout = project(graph, consist, state, &self.layout);

        let attached_wagons = layout
            .wagon_positions
            .iter()
            .map(|&(id, position)| WagonView {
                id,
                wagon_type: consist.wagon(id).wagon_type,
                position,
                orientation: layout.orientation,
                attached: true,
            })
            .collect();

        let station_pools = graph
            .iter()
            .map(|station| {
                let pool = pool_positions(graph, consist, station.id, &self.layout)
                    .into_iter()
                    .map(|(id, position)| WagonView {
                        id,
                        wagon_type: consist.wagon(id).wagon_type,
                        position,
                        orientation: 0.0,
                        attached: false,
                    })
                    .collect();
                (station.id, pool)
            })
            .collect();

        RenderState {
            stations: graph
                .iter()
                .map(|s| StationView {
                    id: s.id,
                    name: s.name.clone(),
                    position: s.position,
                })
                .collect(),
            tracks: graph.tracks().collect(),
            locomotive: LocomotiveView {
                station_id: consist.locomotive_station(),
                position: layout.locomotive_position,
                orientation: layout.orientation,
                moving: state.is_moving(),
            },
            attached_wagons,
            station_pools,
            armed: self.armed,
            coupling_offer: self.coupling_offer,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::simulation::engine::tests::build_engine;

    pub fn build_dispatcher() -> Dispatcher {
        let settings = ShuntingSettings {
            move_duration_s: 2.0,
            ..Default::default()
        };
        Dispatcher::new(build_engine(), &settings)
    }

    fn travel(dispatcher: &mut Dispatcher, to: StationId) -> TickOutcome {
        dispatcher.on_station_clicked(to).armed.unwrap();
        dispatcher.on_confirm_move().unwrap();
        dispatcher.tick(2.0).expect("arrived")
    }

    #[test]
    fn test_click_arms_only_reachable_stations() {
        let mut dispatcher = build_dispatcher();
        let click = dispatcher.on_station_clicked(2);
        assert_eq!(click.armed, Ok(()));
        assert_eq!(click.info.name, "Cornfield");
        assert_eq!(click.info.wagons.get(WagonType::Yellow), 2);
        assert_eq!(dispatcher.armed(), Some(2));

        let click = dispatcher.on_station_clicked(4);
        assert_eq!(click.armed, Err(ShuntingError::UnreachableStation { from: 1, to: 4 }));
        assert_eq!(click.info.wagons.total(), 1);
        assert_eq!(dispatcher.armed(), None);
        assert_eq!(dispatcher.selected(), Some(4));
    }

    #[test]
    fn test_confirm_requires_armed_move() {
        let mut dispatcher = build_dispatcher();
        assert_eq!(dispatcher.on_confirm_move(), Err(ShuntingError::NoMoveArmed));

        dispatcher.on_station_clicked(2);
        dispatcher.disarm();
        assert_eq!(dispatcher.on_confirm_move(), Err(ShuntingError::NoMoveArmed));

        dispatcher.on_station_clicked(2);
        assert_eq!(dispatcher.on_confirm_move(), Ok(MoveStarted { from: 1, to: 2 }));
        assert_eq!(dispatcher.armed(), None);
        assert!(dispatcher.engine().state().is_moving());
    }

    #[test]
    fn test_click_while_moving_does_not_arm() {
        let mut dispatcher = build_dispatcher();
        dispatcher.on_station_clicked(2);
        dispatcher.on_confirm_move().unwrap();
        let click = dispatcher.on_station_clicked(1);
        assert_eq!(click.armed, Err(ShuntingError::EngineBusy(2)));
        assert!(!click.info.reachable);
        assert_eq!(dispatcher.on_confirm_move(), Err(ShuntingError::NoMoveArmed));
    }

    #[test]
    fn test_tick_scales_with_move_duration() {
        let mut dispatcher = build_dispatcher();
        dispatcher.on_station_clicked(2);
        dispatcher.on_confirm_move().unwrap();
        assert!(dispatcher.tick(1.0).is_none());
        let state = dispatcher.render_state();
        assert_eq!(state.locomotive.position, vec2(50.0, 0.0));
        assert!(state.locomotive.moving);
        let outcome = dispatcher.tick(1.0).unwrap();
        assert_eq!(outcome.arrival.station_id, 2);
    }

    #[test]
    fn test_coupling_offer_on_arrival() {
        let mut dispatcher = build_dispatcher();
        let outcome = travel(&mut dispatcher, 2);
        assert!(outcome.coupling_offered);
        assert_eq!(dispatcher.coupling_offer(), Some(2));

        dispatcher.couple_offered(1).unwrap();
        assert_eq!(dispatcher.coupling_offer(), Some(2));
        dispatcher.couple_offered(2).unwrap();
        assert_eq!(dispatcher.coupling_offer(), None);
        assert_eq!(dispatcher.couple_offered(2), Err(ShuntingError::NoCouplingOffer));
        assert_eq!(dispatcher.train_counts().get(WagonType::Yellow), 2);
    }

    #[test]
    fn test_no_offer_at_empty_station() {
        let mut dispatcher = build_dispatcher();
        travel(&mut dispatcher, 2);
        dispatcher.leave_offered().unwrap();
        let outcome = travel(&mut dispatcher, 1);
        assert!(!outcome.coupling_offered);
        assert_eq!(dispatcher.leave_offered(), Err(ShuntingError::NoCouplingOffer));
    }

    #[test]
    fn test_new_move_clears_offer() {
        let mut dispatcher = build_dispatcher();
        travel(&mut dispatcher, 2);
        assert_eq!(dispatcher.coupling_offer(), Some(2));
        dispatcher.on_station_clicked(1);
        dispatcher.on_confirm_move().unwrap();
        assert_eq!(dispatcher.coupling_offer(), None);
    }

    #[test]
    fn test_drag_decisions() {
        let mut dispatcher = build_dispatcher();
        assert_eq!(
            dispatcher.on_wagon_drag_end(1, DropDecision::Couple),
            Err(ShuntingError::WagonNotAtLocomotiveStation {
                wagon: 1,
                station: 2,
                locomotive: 1
            })
        );

        travel(&mut dispatcher, 2);
        dispatcher.on_wagon_drag_end(1, DropDecision::Couple).unwrap();
        dispatcher.on_wagon_drag_end(2, DropDecision::Return).unwrap();
        assert_eq!(dispatcher.engine().consist().attached_ids(), &[1]);

        travel(&mut dispatcher, 4);
        dispatcher.on_wagon_drag_end(1, DropDecision::Decouple).unwrap();
        assert_eq!(dispatcher.engine().consist().pool(4), &[3, 1]);
    }

    #[test]
    fn test_render_state_snapshot() {
        let mut dispatcher = build_dispatcher();
        travel(&mut dispatcher, 2);
        dispatcher.couple_offered(1).unwrap();

        let state = dispatcher.render_state();
        assert_eq!(state.stations.len(), 6);
        assert_eq!(state.tracks.len(), 4);
        assert_eq!(state.locomotive.station_id, 2);
        assert_eq!(state.locomotive.position, vec2(100.0, 0.0));
        assert_eq!(state.attached_wagons.len(), 1);
        assert_eq!(state.attached_wagons[0].position, vec2(30.0, 0.0));
        assert_eq!(state.wagons().count(), 4);
        let (_, pool) = state.station_pools.iter().find(|(id, _)| *id == 2).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 2);
    }

    #[test]
    fn test_from_level() {
        let level = Level::from_toml(crate::level::tests::SAMPLE_LEVEL).unwrap();
        let dispatcher = Dispatcher::from_level(&level).unwrap();
        assert_eq!(dispatcher.engine().consist().locomotive_station(), 1);
        assert_eq!(dispatcher.settings().move_duration_s, 1.0);
        assert_eq!(dispatcher.station_info(2).wagons.get(WagonType::Yellow), 2);
    }

    #[test]
    fn test_wagon_counts() {
        let dispatcher = build_dispatcher();
        let counts = dispatcher.station_info(2).wagons;
        assert_eq!(counts.get(WagonType::Yellow), 2);
        assert_eq!(counts.get(WagonType::Red), 0);
        assert_eq!(counts.total(), 2);
        assert_eq!(dispatcher.train_counts().total(), 0);
        assert_eq!(WagonCounts::default().get(WagonType::Blue), 0);
    }
}
