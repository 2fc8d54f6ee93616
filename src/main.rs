mod assets;
mod camera;
mod common;
mod display;
mod level;
mod simulation;
mod time_controls;

use crate::assets::AssetLoadingPlugin;
use crate::camera::CameraPlugin;
use crate::display::DisplayPlugin;
use crate::simulation::SimulationPlugin;
use crate::time_controls::TimeControlsPlugin;
use bevy::dev_tools::fps_overlay::FpsOverlayPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Rail Shunting".into(),
                        resolution: (1280, 960).into(),
                        ..default()
                    }),
                    ..default()
                })
                .set(LogPlugin {
                    filter: "wgpu=error,naga=warn,rail_shunting=debug".into(),
                    ..default()
                }),
        )
        .add_plugins(FpsOverlayPlugin::default())
        .add_plugins((
            AssetLoadingPlugin,
            SimulationPlugin,
            CameraPlugin,
            DisplayPlugin,
            TimeControlsPlugin,
        ))
        .run();
}
