use crate::common::{HexColor, StationId, WagonType};
use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, LoadContext};
use bevy::prelude::*;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

const DEFAULT_MOVE_DURATION_S: f32 = 2.0;
const DEFAULT_WAGON_SPACING: f32 = 70.0;
const DEFAULT_POOL_OFFSET: [f32; 2] = [50.0, 30.0];
const DEFAULT_POOL_STEP: [f32; 2] = [30.0, 20.0];
const DEFAULT_DECOUPLE_DISTANCE: f32 = 10.0;
const DEFAULT_COUPLE_DISTANCE: f32 = 60.0;

fn default_move_duration() -> f32 {
    DEFAULT_MOVE_DURATION_S
}

fn default_wagon_spacing() -> f32 {
    DEFAULT_WAGON_SPACING
}

fn default_pool_offset() -> [f32; 2] {
    DEFAULT_POOL_OFFSET
}

fn default_pool_step() -> [f32; 2] {
    DEFAULT_POOL_STEP
}

fn default_decouple_distance() -> f32 {
    DEFAULT_DECOUPLE_DISTANCE
}

fn default_couple_distance() -> f32 {
    DEFAULT_COUPLE_DISTANCE
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("level file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("could not parse level file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("level has no stations")]
    NoStations,
    #[error("station {0} is defined more than once")]
    DuplicateStation(StationId),
    #[error("station {station} is connected to unknown station {target}")]
    UnknownConnection { station: StationId, target: StationId },
    #[error("station {0} is connected to itself")]
    SelfConnection(StationId),
    #[error("no station holds the locomotive")]
    NoLocomotive,
    #[error("stations {0} and {1} both hold a locomotive")]
    MultipleLocomotives(StationId, StationId),
    #[error("setting `{0}` is out of range")]
    InvalidSetting(&'static str),
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ShuntingSettings {
    #[serde(default = "default_move_duration")]
    pub move_duration_s: f32,
    #[serde(default = "default_wagon_spacing")]
    pub wagon_spacing: f32,
    #[serde(default = "default_pool_offset")]
    pub pool_offset: [f32; 2],
    #[serde(default = "default_pool_step")]
    pub pool_step: [f32; 2],
    #[serde(default = "default_decouple_distance")]
    pub decouple_distance: f32,
    #[serde(default = "default_couple_distance")]
    pub couple_distance: f32,
}

impl Default for ShuntingSettings {
    fn default() -> Self {
        ShuntingSettings {
            move_duration_s: DEFAULT_MOVE_DURATION_S,
            wagon_spacing: DEFAULT_WAGON_SPACING,
            pool_offset: DEFAULT_POOL_OFFSET,
            pool_step: DEFAULT_POOL_STEP,
            decouple_distance: DEFAULT_DECOUPLE_DISTANCE,
            couple_distance: DEFAULT_COUPLE_DISTANCE,
        }
    }
}

impl ShuntingSettings {
    pub fn validate(&self) -> Result<(), LevelError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        let finite = |v: [f32; 2]| v.iter().all(|x| x.is_finite());

        if !positive(self.move_duration_s) {
            return Err(LevelError::InvalidSetting("move_duration_s"));
        }
        if !positive(self.wagon_spacing) {
            return Err(LevelError::InvalidSetting("wagon_spacing"));
        }
        if !non_negative(self.decouple_distance) {
            return Err(LevelError::InvalidSetting("decouple_distance"));
        }
        if !non_negative(self.couple_distance) {
            return Err(LevelError::InvalidSetting("couple_distance"));
        }
        if !finite(self.pool_offset) {
            return Err(LevelError::InvalidSetting("pool_offset"));
        }
        if !finite(self.pool_step) {
            return Err(LevelError::InvalidSetting("pool_step"));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StationData {
    pub id: StationId,
    pub x: f32,
    pub y: f32,
    pub name: String,
    #[serde(default)]
    pub connections: Vec<StationId>,
    #[serde(default)]
    pub has_locomotive: bool,
    #[serde(default)]
    pub wagons: Vec<WagonType>,
}

#[derive(Asset, TypePath, Deserialize, Debug)]
pub struct Level {
    #[serde(default)]
    pub background: HexColor,
    #[serde(default)]
    pub settings: ShuntingSettings,
    pub stations: Vec<StationData>,
}

impl Level {
    pub fn from_toml(contents: &str) -> Result<Level, LevelError> {
        let level: Level = toml::from_str(contents)?;
        level.validate()?;
        Ok(level)
    }

    /// Checks the station graph for integrity and returns the id of the locomotive station.
    pub fn validate(&self) -> Result<StationId, LevelError> {
        if self.stations.is_empty() {
            return Err(LevelError::NoStations);
        }

        let mut ids = HashSet::with_capacity(self.stations.len());
        for station in &self.stations {
            if !ids.insert(station.id) {
                return Err(LevelError::DuplicateStation(station.id));
            }
        }

        for station in &self.stations {
            for &target in &station.connections {
                if target == station.id {
                    return Err(LevelError::SelfConnection(station.id));
                }
                if !ids.contains(&target) {
                    return Err(LevelError::UnknownConnection {
                        station: station.id,
                        target,
                    });
                }
                let reverse = self
                    .stations
                    .iter()
                    .find(|s| s.id == target)
                    .is_some_and(|s| s.connections.contains(&station.id));
                if !reverse {
                    warn!("Track {} -> {} is one-way", station.id, target);
                }
            }
        }

        self.settings.validate()?;
        self.locomotive_station()
    }

    pub fn locomotive_station(&self) -> Result<StationId, LevelError> {
        let locomotives = self.stations.iter().filter(|s| s.has_locomotive).map(|s| s.id).collect_vec();
        match locomotives.as_slice() {
            [] => Err(LevelError::NoLocomotive),
            [id] => Ok(*id),
            [first, second, ..] => Err(LevelError::MultipleLocomotives(*first, *second)),
        }
    }
}

#[derive(Default, TypePath)]
pub struct LevelLoader;

impl AssetLoader for LevelLoader {
    type Asset = Level;
    type Settings = ();
    type Error = LevelError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let level = Level::from_toml(std::str::from_utf8(&bytes)?)?;
        info!("Loaded level with {} stations", level.stations.len());
        Ok(level)
    }

    fn extensions(&self) -> &[&str] {
        &["toml"]
    }
}
