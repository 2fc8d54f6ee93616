pub mod consist;
pub mod coupling_menu;
pub mod info_panel;

use crate::assets::{AssetHandles, LoadingState};
use crate::common::{StationId, map_to_world};
use crate::display::consist::ConsistDisplayPlugin;
use crate::display::coupling_menu::CouplingMenuPlugin;
use crate::display::info_panel::InfoPanelPlugin;
use crate::level::Level;
use crate::simulation::dispatch::{Dispatcher, StationView};
use crate::simulation::graph::TrackSegment;
use crate::simulation::messages::ShuntingCommand;
use bevy::prelude::*;
use std::collections::HashMap;

pub const STATION_RADIUS: f32 = 15.0;
const STATION_COLOR: Color = Color::srgba_u8(0x4A, 0x32, 0x67, 0x80);
const STATION_SELECTED_COLOR: Color = Color::srgba_u8(0x4A, 0x32, 0x67, 0xE0);
const STATION_ARMED_COLOR: Color = Color::srgba_u8(0x20, 0xA0, 0x40, 0xE0);
const TRACK_COLOR: Color = Color::srgba_u8(0x64, 0x54, 0x52, 0xA0);
const TRACK_WIDTH: f32 = 4.0;
/// Tracks stop short of the station centers by this much.
const TRACK_OFFSET: f32 = 15.0;
const LABEL_OFFSET: Vec2 = Vec2::new(0.0, 30.0);

const TRACK_Z: f32 = 0.0;
const STATION_Z: f32 = 1.0;

#[derive(Component)]
#[require(Pickable)]
pub struct StationMarker(pub StationId);

#[derive(Resource, Deref, DerefMut, Default)]
struct StationMapper(HashMap<StationId, Entity>);

fn get_station_bundle(station: &StationView) -> impl Bundle {
    (
        StationMarker(station.id),
        Sprite::from_color(STATION_COLOR, Vec2::splat(STATION_RADIUS * 2.0)),
        Transform::from_translation(map_to_world(station.position).extend(STATION_Z)),
    )
}

fn get_label_bundle(station: &StationView) -> impl Bundle {
    (
        Text2d::new(station.name.clone()),
        TextFont::from_font_size(14.0),
        TextColor(Color::BLACK),
        Transform::from_translation(map_to_world(station.position + LABEL_OFFSET).extend(STATION_Z)),
        Pickable::IGNORE,
    )
}

fn get_track_bundle(track: &TrackSegment) -> impl Bundle {
    let start = map_to_world(track.start);
    let end = map_to_world(track.end);
    let delta = end - start;
    let length = (delta.length() - 2.0 * TRACK_OFFSET).max(0.0);

    (
        Sprite::from_color(TRACK_COLOR, vec2(length, TRACK_WIDTH)),
        Transform::from_translation(start.midpoint(end).extend(TRACK_Z))
            .with_rotation(Quat::from_rotation_z(delta.to_angle())),
        Pickable::IGNORE,
    )
}

fn station_color(station_id: StationId, dispatcher: &Dispatcher) -> Color {
    if dispatcher.armed() == Some(station_id) {
        STATION_ARMED_COLOR
    } else if dispatcher.selected() == Some(station_id) {
        STATION_SELECTED_COLOR
    } else {
        STATION_COLOR
    }
}

pub struct DisplayPlugin;

impl Plugin for DisplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StationMapper>()
            .add_plugins((ConsistDisplayPlugin, InfoPanelPlugin, CouplingMenuPlugin))
            .add_systems(OnEnter(LoadingState::Loaded), set_background)
            .add_systems(
                Update,
                (
                    setup.run_if(resource_added::<Dispatcher>),
                    highlight_stations.run_if(resource_exists_and_changed::<Dispatcher>),
                    move_keys,
                ),
            );
    }
}

fn set_background(handles: Res<AssetHandles>, levels: Res<Assets<Level>>, mut clear_color: ResMut<ClearColor>) {
    let level = levels.get(&handles.level).expect("level had been loaded");
    *clear_color = ClearColor(level.background.into());
}

fn setup(dispatcher: Res<Dispatcher>, mut mapper: ResMut<StationMapper>, mut commands: Commands) {
    let state = dispatcher.render_state();

    for track in &state.tracks {
        commands.spawn(get_track_bundle(track));
    }
    for station in &state.stations {
        let entity = commands
            .spawn(get_station_bundle(station))
            .observe(on_station_click)
            .id();
        mapper.insert(station.id, entity);
        commands.spawn(get_label_bundle(station));
    }
    debug!("Spawned {} stations and {} tracks", state.stations.len(), state.tracks.len());
}

fn on_station_click(
    event: On<Pointer<Click>>,
    stations: Query<&StationMarker>,
    mut shunting_commands: MessageWriter<ShuntingCommand>,
) {
    if event.button != PointerButton::Primary {
        return;
    }
    if let Ok(station) = stations.get(event.entity) {
        shunting_commands.write(ShuntingCommand::StationClicked(station.0));
    }
}

fn highlight_stations(dispatcher: Res<Dispatcher>, mapper: Res<StationMapper>, mut sprites: Query<&mut Sprite>) {
    for (&station_id, &entity) in mapper.iter() {
        let mut sprite = sprites.get_mut(entity).expect("invalid station entity");
        let color = station_color(station_id, &dispatcher);
        if sprite.color != color {
            sprite.color = color;
        }
    }
}

fn move_keys(keyboard_input: Res<ButtonInput<KeyCode>>, mut shunting_commands: MessageWriter<ShuntingCommand>) {
    if keyboard_input.just_pressed(KeyCode::Enter) {
        shunting_commands.write(ShuntingCommand::ConfirmMove);
    }
    if keyboard_input.just_pressed(KeyCode::Escape) {
        shunting_commands.write(ShuntingCommand::Disarm);
    }
}
