use bevy::prelude::*;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, de::Error};
use serde_repr::Deserialize_repr;
use std::fmt;

pub type StationId = u32;
pub type WagonId = u32;

#[derive(Deserialize_repr, Reflect, PartialEq, Eq, Copy, Clone, Debug, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum WagonType {
    Red = 1,
    Blue = 2,
    Green = 3,
    Yellow = 4,
}

impl WagonType {
    pub const ALL: [WagonType; 4] = [WagonType::Red, WagonType::Blue, WagonType::Green, WagonType::Yellow];

    pub fn color(&self) -> Color {
        match self {
            WagonType::Red => Color::srgb_u8(0xD6, 0x45, 0x3D),
            WagonType::Blue => Color::srgb_u8(0x3D, 0x6F, 0xD6),
            WagonType::Green => Color::srgb_u8(0x3D, 0xA8, 0x4F),
            WagonType::Yellow => Color::srgb_u8(0xE8, 0xC1, 0x3A),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WagonType::Red => "red",
            WagonType::Blue => "blue",
            WagonType::Green => "green",
            WagonType::Yellow => "yellow",
        }
    }
}

impl fmt::Display for WagonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Reflect, Copy, Clone, Debug)]
pub struct HexColor(Srgba);

impl Default for HexColor {
    fn default() -> Self {
        HexColor(Srgba::rgb_u8(0x87, 0xCE, 0xEB))
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColorVisitor;

        impl<'de> Visitor<'de> for ColorVisitor {
            type Value = HexColor;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a hex color string (e.g., #ff0000)")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Srgba::hex(v).map_err(E::custom).map(HexColor)
            }
        }

        deserializer.deserialize_str(ColorVisitor)
    }
}

impl From<HexColor> for Color {
    fn from(c: HexColor) -> Self {
        c.0.into()
    }
}

/// Map coordinates grow downward, world coordinates grow upward.
pub fn map_to_world(point: Vec2) -> Vec2 {
    vec2(point.x, -point.y)
}

pub fn world_to_map(point: Vec2) -> Vec2 {
    vec2(point.x, -point.y)
}

pub fn map_rotation(orientation: f32) -> Quat {
    Quat::from_rotation_z(-orientation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Sample {
        color: HexColor,
        wagons: Vec<WagonType>,
    }

    #[test]
    fn test_deserialize_color_and_wagons() {
        let sample: Sample = toml::from_str("color = '#ff0000'\nwagons = [4, 1]").unwrap();
        assert_eq!(sample.color.0, Srgba::rgb_u8(0xFF, 0, 0));
        assert_eq!(sample.wagons, vec![WagonType::Yellow, WagonType::Red]);
    }

    #[test]
    fn test_unknown_wagon_class_rejected() {
        let sample = toml::from_str::<Sample>("color = '#ff0000'\nwagons = [5]");
        assert!(sample.is_err());
    }

    #[test]
    fn test_map_world_round_trip() {
        let point = vec2(237.0, 215.0);
        assert_eq!(map_to_world(point), vec2(237.0, -215.0));
        assert_eq!(world_to_map(map_to_world(point)), point);
    }
}
