use bevy::dev_tools::fps_overlay::FpsOverlayConfig;
use bevy::prelude::*;
use std::time::Duration;

const MULTIPLIERS: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0];
const DEFAULT_MULTIPLIER_INDEX: usize = 2;

#[derive(Resource)]
pub struct TimeControls {
    pub time_scale: f64,
    pub multiplier_index: usize,
    pub paused: bool,
}

impl TimeControls {
    fn inc(&mut self) -> Option<f64> {
        if self.multiplier_index < MULTIPLIERS.len() - 1 {
            self.multiplier_index += 1;
            self.time_scale = MULTIPLIERS[self.multiplier_index];
            return Some(self.time_scale);
        }
        None
    }

    fn dec(&mut self) -> Option<f64> {
        if self.multiplier_index > 0 {
            self.multiplier_index -= 1;
            self.time_scale = MULTIPLIERS[self.multiplier_index];
            return Some(self.time_scale);
        }
        None
    }

    pub fn label(&self) -> String {
        let scale = if self.time_scale >= 1.0 {
            format!("{}x", self.time_scale as u32)
        } else {
            format!("{:.2}x", self.time_scale)
        };
        if self.paused {
            format!("Speed {} (paused)", scale)
        } else {
            format!("Speed {}", scale)
        }
    }
}

impl Default for TimeControls {
    fn default() -> Self {
        TimeControls {
            time_scale: MULTIPLIERS[DEFAULT_MULTIPLIER_INDEX],
            multiplier_index: DEFAULT_MULTIPLIER_INDEX,
            paused: false,
        }
    }
}

#[derive(Component)]
struct TimeScaleText;

pub struct TimeControlsPlugin;

impl Plugin for TimeControlsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TimeControls>()
            .add_systems(Startup, setup)
            .add_systems(Update, time_controls);
    }
}

fn setup(mut commands: Commands, time_controls: Res<TimeControls>) {
    commands.spawn((
        Text::new(time_controls.label()),
        TextFont::from_font_size(16.0),
        TextColor(Color::BLACK),
        Node {
            position_type: PositionType::Absolute,
            top: px(8),
            left: px(120),
            ..default()
        },
        TimeScaleText,
        Pickable::IGNORE,
    ));
}

fn time_controls(
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mut time_controls: ResMut<TimeControls>,
    mut time: ResMut<Time<Virtual>>,
    mut overlay_config: ResMut<FpsOverlayConfig>,
    mut label: Single<&mut Text, With<TimeScaleText>>,
) {
    let new_time_scale = if keyboard_input.just_pressed(KeyCode::ArrowUp) {
        time_controls.inc()
    } else if keyboard_input.just_pressed(KeyCode::ArrowDown) {
        time_controls.dec()
    } else {
        None
    };
    if let Some(new_time_scale) = new_time_scale {
        time.set_relative_speed_f64(new_time_scale);
        overlay_config.refresh_interval = Duration::from_millis((100.0 * new_time_scale) as u64);
        info!("Setting timescale to {}", new_time_scale);
    }

    if keyboard_input.just_pressed(KeyCode::KeyP) {
        time_controls.paused = !time_controls.paused;
        if time_controls.paused {
            time.pause();
            info!("Paused");
        } else {
            time.unpause();
            info!("Resumed");
        }
    }

    if time_controls.is_changed() {
        label.0 = time_controls.label();
    }
}
