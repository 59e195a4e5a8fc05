use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::baker::BakeSettings;
use crate::color::Color;
use crate::grid::{parse_map, GridBuilder, GridError, TileMap};
use crate::light::LightSet;
use crate::sh::SphericalHarmonics;

pub const PROJECT_VERSION: u32 = 1;

/// Map lights hang this far from the center of their cell.
pub const MAP_LIGHT_OFFSET: Vec3 = Vec3::new(-0.5, 1.5, -0.5);

const DEFAULT_MAP: [&str; 10] = [
    "1111111111",
    "1000000001",
    "1000000001",
    "1011001101",
    "1010000101",
    "1010000101",
    "1010010101",
    "1011010101",
    "1001000001",
    "1101111101",
];

/// Everything needed to rebuild and bake a tile level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeProject {
    pub version: u32,
    pub settings: BakeSettings,
    pub tiles: TileSettings,
    /// One string of digits per map row.
    pub map: Vec<String>,
    pub lights: Vec<MapLight>,
    pub sun: Option<SunLight>,
    pub environment: Environment,
}

impl Default for BakeProject {
    fn default() -> Self {
        Self {
            version: PROJECT_VERSION,
            settings: BakeSettings::default().with_bounce_samples(64),
            tiles: TileSettings::default(),
            map: DEFAULT_MAP.iter().map(|row| row.to_string()).collect(),
            lights: vec![MapLight::new(4, 2, Color::WHITE)],
            sun: Some(SunLight::default()),
            environment: Environment::default(),
        }
    }
}

impl BakeProject {
    pub fn tile_map(&self) -> Result<TileMap, GridError> {
        parse_map(&self.map.join("\n"))
    }

    /// Lights and environment for baking `map` as laid out by `grid`. Map
    /// lights outside the map are dropped.
    pub fn light_set(&self, grid: &GridBuilder, map: &TileMap) -> LightSet {
        let mut lights = LightSet::new();
        for light in &self.lights {
            if light.x >= map.width() || light.y >= map.height() {
                tracing::warn!(x = light.x, y = light.y, "map light outside the map, skipped");
                continue;
            }
            let at = grid.tile_position(light.x, light.y, map.width(), map.height())
                + MAP_LIGHT_OFFSET;
            lights.add_point_light(at, light.color, light.intensity);
        }

        if let Some(sun) = &self.sun {
            lights.add_directional_light(Vec3::from(sun.direction), sun.color, sun.intensity);
        }

        lights.set_ambient(SphericalHarmonics::uniform(self.environment.ambient));
        lights.set_sky(SphericalHarmonics::from_gradient(
            self.environment.sky_zenith,
            self.environment.sky_horizon,
            self.environment.sky_ground,
        ));
        lights
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    pub size: f32,
    pub wall_height: f32,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            size: 1.0,
            wall_height: 2.0,
        }
    }
}

/// Point light above map cell `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapLight {
    pub x: usize,
    pub y: usize,
    #[serde(default = "default_map_light_color")]
    pub color: Color,
    #[serde(default = "default_map_light_intensity")]
    pub intensity: f32,
}

impl MapLight {
    pub fn new(x: usize, y: usize, color: Color) -> Self {
        Self {
            x,
            y,
            color,
            intensity: default_map_light_intensity(),
        }
    }

    /// Light tinted with `hue` the way the map editor picks colors.
    pub fn with_hue(x: usize, y: usize, hue: f32) -> Self {
        Self::new(x, y, Color::hsv(hue, 0.3, 1.0).to_linear())
    }
}

fn default_map_light_color() -> Color {
    Color::WHITE
}

fn default_map_light_intensity() -> f32 {
    0.9
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunLight {
    /// Direction the light travels in.
    pub direction: [f32; 3],
    pub color: Color,
    pub intensity: f32,
}

impl Default for SunLight {
    fn default() -> Self {
        Self {
            direction: [-1.0, -1.1, 0.4],
            color: Color::hsv(0.1, 0.3, 1.0).to_linear(),
            intensity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub ambient: Color,
    pub sky_zenith: Color,
    pub sky_horizon: Color,
    pub sky_ground: Color,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            ambient: Color::BLACK,
            sky_zenith: Color::rgb(0.45, 0.55, 0.8),
            sky_horizon: Color::rgb(0.6, 0.6, 0.65),
            sky_ground: Color::rgb(0.15, 0.13, 0.12),
        }
    }
}
