use crate::common::map_to_world;
use crate::simulation::dispatch::Dispatcher;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

const ZOOM_SPEED: f32 = 0.15;
const MIN_SCALE: f32 = 0.25;
const MAX_SCALE: f32 = 4.0;
/// Horizontal shift of the initial view so the map is not hidden behind the side panel.
const PANEL_COMPENSATION: f32 = 120.0;

#[derive(Component)]
pub struct MapCamera;

#[derive(Resource, Default)]
struct CameraDrag {
    dragging: bool,
    last_pos: Vec2,
}

pub fn camera_scale(projection: &Projection) -> f32 {
    match projection {
        Projection::Orthographic(ortho) => ortho.scale,
        _ => 1.0,
    }
}

fn zoomed_scale(scale: f32, dy: f32) -> f32 {
    (scale * (1.0 - dy * ZOOM_SPEED)).clamp(MIN_SCALE, MAX_SCALE)
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraDrag>()
            .add_systems(Startup, setup_camera)
            .add_systems(
                Update,
                (
                    center_on_map.run_if(resource_added::<Dispatcher>),
                    camera_pan_drag,
                    camera_zoom,
                ),
            );
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((Camera2d, MapCamera));
}

fn center_on_map(dispatcher: Res<Dispatcher>, mut camera: Single<&mut Transform, With<MapCamera>>) {
    let state = dispatcher.render_state();
    let Some(first) = state.stations.first() else {
        return;
    };
    let (min, max) = state
        .stations
        .iter()
        .fold((first.position, first.position), |(min, max), s| {
            (min.min(s.position), max.max(s.position))
        });
    let center = map_to_world(min.midpoint(max));
    camera.translation.x = center.x + PANEL_COMPENSATION;
    camera.translation.y = center.y;
}

fn camera_pan_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    window: Single<&Window>,
    mut drag: ResMut<CameraDrag>,
    mut camera: Single<(&mut Transform, &Projection), With<MapCamera>>,
) {
    if buttons.just_pressed(MouseButton::Right)
        && let Some(pos) = window.cursor_position()
    {
        drag.dragging = true;
        drag.last_pos = pos;
    }
    if buttons.just_released(MouseButton::Right) {
        drag.dragging = false;
    }

    if drag.dragging
        && let Some(pos) = window.cursor_position()
    {
        let (transform, projection) = &mut *camera;
        let scale = camera_scale(projection);
        let delta = pos - drag.last_pos;
        transform.translation.x -= delta.x * scale;
        transform.translation.y += delta.y * scale;
        drag.last_pos = pos;
    }
}

fn camera_zoom(mut scroll_events: MessageReader<MouseWheel>, mut camera: Single<&mut Projection, With<MapCamera>>) {
    for event in scroll_events.read() {
        let dy = match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 100.0,
        };
        if let Projection::Orthographic(ortho) = &mut **camera {
            ortho.scale = zoomed_scale(ortho.scale, dy);
        }
    }
}
