use glam::Vec3;

use crate::color::Color;
use crate::sh::SphericalHarmonics;

/// A bake light. Directional lights keep the unit vector pointing from the
/// surface toward the light in `position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
    pub directional: bool,
}

impl Light {
    pub fn point(at: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position: at,
            color,
            intensity,
            directional: false,
        }
    }

    /// `direction` is the direction the light travels in.
    pub fn directional(direction: Vec3, color: Color, intensity: f32) -> Self {
        Self {
            position: -direction.normalize_or_zero(),
            color,
            intensity,
            directional: true,
        }
    }
}

/// Everything that contributes light to a sample point.
#[derive(Debug, Clone, Default)]
pub struct LightSet {
    pub lights: Vec<Light>,
    pub ambient: SphericalHarmonics,
    pub sky: SphericalHarmonics,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point_light(&mut self, at: Vec3, color: Color, intensity: f32) {
        self.lights.push(Light::point(at, color, intensity));
    }

    pub fn add_directional_light(&mut self, direction: Vec3, color: Color, intensity: f32) {
        self.lights
            .push(Light::directional(direction, color, intensity));
    }

    pub fn set_ambient(&mut self, ambient: SphericalHarmonics) {
        self.ambient = ambient;
    }

    pub fn set_sky(&mut self, sky: SphericalHarmonics) {
        self.sky = sky;
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
