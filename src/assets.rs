use crate::level::{Level, LevelLoader};
use bevy::asset::LoadState;
use bevy::prelude::*;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Default, States)]
pub enum LoadingState {
    #[default]
    Loading,
    Loaded,
    Failed,
}

#[derive(Resource)]
pub struct AssetHandles {
    pub level: Handle<Level>,
}

pub struct AssetLoadingPlugin;

impl Plugin for AssetLoadingPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<Level>()
            .init_asset_loader::<LevelLoader>()
            .init_state::<LoadingState>()
            .add_systems(Startup, start_loading)
            .add_systems(Update, poll_loading.run_if(in_state(LoadingState::Loading)));
    }
}

fn start_loading(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(AssetHandles {
        level: asset_server.load("level.toml"),
    });
    info!("Level load started");
}

fn poll_loading(
    handles: Res<AssetHandles>,
    asset_server: Res<AssetServer>,
    mut next_loading_state: ResMut<NextState<LoadingState>>,
) {
    if let Some(state) = next_state(asset_server.load_state(&handles.level)) {
        next_loading_state.set(state);
    }
}

fn next_state(load_state: LoadState) -> Option<LoadingState> {
    match load_state {
        LoadState::Loaded => {
            info!("Level load complete");
            Some(LoadingState::Loaded)
        }
        LoadState::Failed(err) => {
            error!("Level could not be loaded: {}", err);
            Some(LoadingState::Failed)
        }
        LoadState::NotLoaded | LoadState::Loading => None,
    }
}
