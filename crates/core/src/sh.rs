use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Color;

const Y0: f32 = 0.282_095;
const Y1: f32 = 0.488_603;
const Y2: f32 = 1.092_548;
const Y6: f32 = 0.315_392;
const Y8: f32 = 0.546_274;

/// Third order (nine coefficient) real spherical harmonics with RGB
/// coefficients. +Y is the polar axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SphericalHarmonics {
    pub coefficients: [[f32; 3]; 9],
}

fn basis(dir: Vec3) -> [f32; 9] {
    let Vec3 { x, y, z } = dir;
    [
        Y0,
        Y1 * y,
        Y1 * z,
        Y1 * x,
        Y2 * x * y,
        Y2 * y * z,
        Y6 * (3.0 * y * y - 1.0),
        Y2 * x * z,
        Y8 * (x * x - z * z),
    ]
}

impl SphericalHarmonics {
    pub fn zero() -> Self {
        Self::default()
    }

    /// The same color from every direction.
    pub fn uniform(color: Color) -> Self {
        let mut sh = Self::zero();
        sh.coefficients[0] = [color.r / Y0, color.g / Y0, color.b / Y0];
        sh
    }

    /// Vertical gradient that evaluates to `zenith` straight up, `horizon`
    /// sideways and `ground` straight down.
    pub fn from_gradient(zenith: Color, horizon: Color, ground: Color) -> Self {
        let zen = Vec3::new(zenith.r, zenith.g, zenith.b);
        let hor = Vec3::new(horizon.r, horizon.g, horizon.b);
        let gnd = Vec3::new(ground.r, ground.g, ground.b);

        let band1 = (zen - gnd) * 0.5;
        let band2 = ((zen + gnd) * 0.5 - hor) / 3.0;
        let band0 = hor + band2;

        let mut sh = Self::zero();
        sh.coefficients[0] = (band0 / Y0).to_array();
        sh.coefficients[1] = (band1 / Y1).to_array();
        sh.coefficients[6] = (band2 / Y6).to_array();
        sh
    }

    /// Projects light arriving from `direction` onto the basis.
    pub fn add_light(&mut self, direction: Vec3, color: Color) {
        let weights = basis(direction.normalize_or_zero());
        for (coefficient, weight) in self.coefficients.iter_mut().zip(weights) {
            coefficient[0] += color.r * weight;
            coefficient[1] += color.g * weight;
            coefficient[2] += color.b * weight;
        }
    }

    pub fn scaled(mut self, factor: f32) -> Self {
        for coefficient in &mut self.coefficients {
            for channel in coefficient.iter_mut() {
                *channel *= factor;
            }
        }
        self
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.iter().flatten().all(|c| *c == 0.0)
    }

    /// Evaluates the function along `direction`. Alpha is always 1.
    pub fn sample(&self, direction: Vec3) -> Color {
        let weights = basis(direction.normalize_or_zero());
        let mut rgb = Vec3::ZERO;
        for (coefficient, weight) in self.coefficients.iter().zip(weights) {
            rgb += Vec3::from(*coefficient) * weight;
        }
        Color::rgb(rgb.x, rgb.y, rgb.z)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn zero_samples_black() {
        let sh = SphericalHarmonics::zero();
        assert!(sh.is_zero());
        assert_eq!(sh.sample(Vec3::X), Color::BLACK);
    }

    #[test]
    fn uniform_is_direction_independent() {
        let sh = SphericalHarmonics::uniform(Color::rgb(0.2, 0.4, 0.6));
        for dir in [Vec3::X, Vec3::NEG_Y, Vec3::new(1.0, 2.0, -3.0)] {
            let c = sh.sample(dir);
            assert_relative_eq!(c.r, 0.2, epsilon = 1e-5);
            assert_relative_eq!(c.g, 0.4, epsilon = 1e-5);
            assert_relative_eq!(c.b, 0.6, epsilon = 1e-5);
        }
    }

    #[test]
    fn gradient_hits_its_endpoints() {
        let sh = SphericalHarmonics::from_gradient(
            Color::rgb(0.3, 0.5, 0.9),
            Color::rgb(0.6, 0.6, 0.6),
            Color::rgb(0.2, 0.1, 0.0),
        );
        let up = sh.sample(Vec3::Y);
        let side = sh.sample(Vec3::Z);
        let down = sh.sample(Vec3::NEG_Y);
        assert_relative_eq!(up.b, 0.9, epsilon = 1e-4);
        assert_relative_eq!(side.g, 0.6, epsilon = 1e-4);
        assert_relative_eq!(down.r, 0.2, epsilon = 1e-4);
    }

    #[test]
    fn light_projection_peaks_toward_light() {
        let mut sh = SphericalHarmonics::zero();
        sh.add_light(Vec3::X, Color::WHITE);
        assert!(sh.sample(Vec3::X).r > sh.sample(Vec3::NEG_X).r);
        assert_relative_eq!(sh.scaled(0.0).sample(Vec3::X).r, 0.0);
    }
}
