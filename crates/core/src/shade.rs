//! Per-point lighting: light visibility, direct lighting and a single
//! diffuse bounce.

use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};

use crate::color::Color;
use crate::light::LightSet;
use crate::noise::Seed;
use crate::ray::Ray;
use crate::scene::StaticScene;

/// Sample points are pushed this far along their normal before tracing.
pub const SURFACE_OFFSET: f32 = 0.01;
/// Grid cells per world unit used to snap sample positions and normals.
pub const QUANTIZE_SCALE: f32 = 200.0;
pub const DEFAULT_LIGHT_CUTOFF: f32 = 1.0 / 255.0;

const POINT_LIGHT_RADIUS: f32 = 0.3;
const DIRECTIONAL_DISTANCE: f32 = 1000.0;
const DIRECTIONAL_RADIUS: f32 = 100.0;
const SOFT_TOLERANCE: f32 = 0.01;
const MISS_DISTANCE_SQ: f32 = 100_000_000.0;
const SNAP_TOLERANCE: f32 = 1e-3;
const BOUNCE_REFERENCE: Vec3 = Vec3::new(0.0, 1.0, -1.003);

const LIGHT_TAPS: [Vec2; 4] = [
    Vec2::new(-0.42, 0.9),
    Vec2::new(0.9, 0.42),
    Vec2::new(0.42, -0.9),
    Vec2::new(-0.9, -0.42),
];

/// Snaps each axis down onto a grid of `scale` cells per unit. Values already
/// within a hair of a grid line are kept on it, so snapping is idempotent.
pub fn quantize(v: Vec3, scale: f32) -> Vec3 {
    let cells = v * scale;
    let nearest = cells.round();
    let on_line = (cells - nearest).abs().cmplt(Vec3::splat(SNAP_TOLERANCE));
    Vec3::select(on_line, nearest, cells.floor()) / scale
}

/// Base 2 radical inverse (Van der Corput).
pub fn radical_inverse(i: u32) -> f32 {
    i.reverse_bits() as f32 * 2.328_306_4e-10
}

pub fn hammersley(i: u32, count: u32) -> Vec2 {
    Vec2::new(i as f32 / count as f32, radical_inverse(i))
}

/// Uniform hemisphere direction around +Y for sample `i` of `count`.
pub fn sample_hemisphere_uniform(i: u32, count: u32) -> Vec3 {
    let xi = hammersley(i, count);
    let phi = xi.y * TAU;
    let cos_theta = 1.0 - xi.x;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(phi.cos() * sin_theta, cos_theta, phi.sin() * sin_theta)
}

/// A surface point ready for shading: offset, snapped and seeded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vec3,
    pub normal: Vec3,
    pub seed: Seed,
}

impl SamplePoint {
    pub fn prepare(position: Vec3, normal: Vec3) -> Self {
        let position = quantize(position + normal * SURFACE_OFFSET, QUANTIZE_SCALE);
        let normal = quantize(normal, QUANTIZE_SCALE);
        Self {
            position,
            normal,
            seed: Seed::from_position(position),
        }
    }
}

/// Shades points against a scene and a light set. Only reads shared state,
/// so one shader can be used from many threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Shader<'a> {
    scene: &'a StaticScene,
    lights: &'a LightSet,
    light_cutoff: f32,
    rotate_bounce_samples: bool,
}

impl<'a> Shader<'a> {
    pub fn new(scene: &'a StaticScene, lights: &'a LightSet) -> Self {
        Self {
            scene,
            lights,
            light_cutoff: DEFAULT_LIGHT_CUTOFF,
            rotate_bounce_samples: false,
        }
    }

    /// Point lights whose unshadowed contribution is at or below `cutoff`
    /// skip their visibility rays.
    pub fn with_light_cutoff(mut self, cutoff: f32) -> Self {
        self.light_cutoff = cutoff;
        self
    }

    /// Spin the bounce pattern around the normal by an angle drawn from each
    /// point's seed.
    pub fn with_rotated_bounces(mut self, rotate: bool) -> Self {
        self.rotate_bounce_samples = rotate;
        self
    }

    /// Fraction of `light_pos` visible from `from`, in `[0, 1]`. Soft mode
    /// spreads four taps over a disc of `radius` facing `from`.
    pub fn visibility(&self, light_pos: Vec3, from: Vec3, radius: f32, soft: bool) -> f32 {
        if !soft {
            let direct = light_pos - from;
            return match self.scene.raycast(&Ray::new(from, direct)) {
                Some(hit) if from.distance_squared(hit.position) < direct.length_squared() => 0.0,
                _ => 1.0,
            };
        }

        let dir = (light_pos - from).normalize_or_zero();
        if dir == Vec3::ZERO {
            return 1.0;
        }
        let (right, up) = dir.any_orthonormal_pair();

        let mut lit = 0;
        for tap in LIGHT_TAPS {
            let target = light_pos + right * (tap.x * radius) + up * (tap.y * radius);
            let to_target = target - from;
            let dist_sq = self
                .scene
                .raycast(&Ray::new(from, to_target))
                .map_or(MISS_DISTANCE_SQ, |hit| from.distance_squared(hit.position));
            if dist_sq + SOFT_TOLERANCE > to_target.length_squared() {
                lit += 1;
            }
        }
        lit as f32 / LIGHT_TAPS.len() as f32
    }

    /// Direct lighting plus ambient, clamped into `[0, 1]`.
    pub fn shade_direct(&self, point: &SamplePoint, soft: bool) -> Color {
        let at = point.position;
        let normal = point.normal;

        let mut color = Color::BLACK;
        for light in &self.lights.lights {
            let contribution = if light.directional {
                let intensity = light.intensity * light.position.dot(normal).max(0.0);
                if intensity > 0.0 {
                    let target = at + light.position * DIRECTIONAL_DISTANCE;
                    self.visibility(target, at, DIRECTIONAL_RADIUS, soft) * intensity
                } else {
                    0.0
                }
            } else {
                let dir = light.position - at;
                let mag_sq = dir.length_squared();
                if mag_sq <= 0.0 {
                    continue;
                }
                let facing = (dir / mag_sq.sqrt()).dot(normal).max(0.0);
                let intensity = light.intensity / mag_sq * facing;
                if intensity > self.light_cutoff {
                    self.visibility(light.position, at, POINT_LIGHT_RADIUS, soft) * intensity
                } else {
                    0.0
                }
            };
            color += light.color * contribution;
        }

        color += self.lights.ambient.sample(normal);
        color.clamp_rgb()
    }

    /// [`Shader::shade_direct`] plus the average of `samples` hemisphere
    /// bounces. Bounce hits get direct light only; misses see the sky. The
    /// bounce sum is not clamped again, so channels may exceed 1.
    pub fn shade_with_bounce(&self, point: &mut SamplePoint, samples: u32, soft: bool) -> Color {
        let mut color = self.shade_direct(point, soft);
        if samples == 0 {
            return color;
        }

        let normal = point.normal;
        let right = normal.cross(BOUNCE_REFERENCE).normalize_or_zero();
        let up = right.cross(normal).normalize_or_zero();
        let spin = if self.rotate_bounce_samples {
            Quat::from_rotation_y(point.seed.next_f() * TAU)
        } else {
            Quat::IDENTITY
        };

        let weight = 1.0 / samples as f32;
        for i in 0..samples {
            let sample = spin * sample_hemisphere_uniform(i, samples);
            let dir = right * sample.x + normal * sample.y + up * sample.z;
            let bounce = match self.scene.raycast(&Ray::new(point.position, dir)) {
                Some(hit) => self.shade_direct(&SamplePoint::prepare(hit.position, hit.normal), false),
                None => self.lights.sky.sample(dir),
            };
            color += bounce * weight;
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use glam::Mat4;

    use super::*;
    use crate::material::{Material, TextureId};
    use crate::mesh::make_plane;
    use crate::scene::InstanceFlags;
    use crate::sh::SphericalHarmonics;

    fn plane_scene(heights: &[f32]) -> StaticScene {
        let plane = Arc::new(make_plane([4.0, 4.0]));
        let material = Arc::new(Material::lit("floor", TextureId::new("floor")));
        let mut scene = StaticScene::new();
        for y in heights {
            scene.add_instance(
                Some(plane.clone()),
                material.clone(),
                Mat4::from_translation(Vec3::new(0.0, *y, 0.0)),
                InstanceFlags::default(),
            );
        }
        scene
    }

    #[test]
    fn quantize_is_idempotent() {
        for i in -500..500 {
            let f = i as f32 * 0.0137;
            let v = Vec3::new(f, -f * 0.73, f * 1.91 + 0.004);
            let once = quantize(v, QUANTIZE_SCALE);
            assert_eq!(quantize(once, QUANTIZE_SCALE), once);
        }
    }

    #[test]
    fn quantize_snaps_down() {
        let q = quantize(Vec3::new(0.0071, -0.0071, 1.0), QUANTIZE_SCALE);
        assert_relative_eq!(q.x, 0.005);
        assert_relative_eq!(q.y, -0.01);
        assert_relative_eq!(q.z, 1.0);
    }

    #[test]
    fn radical_inverse_reverses_bits() {
        assert_eq!(radical_inverse(0), 0.0);
        assert_relative_eq!(radical_inverse(1), 0.5);
        assert_relative_eq!(radical_inverse(2), 0.25);
        assert_relative_eq!(radical_inverse(3), 0.75);
    }

    #[test]
    fn hemisphere_samples_are_unit_and_upward() {
        for i in 0..64 {
            let s = sample_hemisphere_uniform(i, 64);
            assert_relative_eq!(s.length(), 1.0, epsilon = 1e-5);
            assert!(s.y > 0.0);
        }
        assert!(sample_hemisphere_uniform(0, 8).abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn visibility_in_empty_scene_is_one() {
        let scene = StaticScene::new();
        let lights = LightSet::new();
        let shader = Shader::new(&scene, &lights);
        for soft in [false, true] {
            let v = shader.visibility(Vec3::new(1.0, 3.0, 2.0), Vec3::ZERO, 0.3, soft);
            assert_eq!(v, 1.0);
        }
    }

    #[test]
    fn occluder_blocks_hard_and_soft() {
        let scene = plane_scene(&[1.0]);
        let lights = LightSet::new();
        let shader = Shader::new(&scene, &lights);
        let from = Vec3::new(0.0, 0.0, 0.0);
        let light = Vec3::new(0.0, 2.0, 0.0);
        assert_eq!(shader.visibility(light, from, 0.3, false), 0.0);
        assert_eq!(shader.visibility(light, from, 0.3, true), 0.0);
    }

    #[test]
    fn geometry_beyond_the_light_does_not_shadow() {
        let scene = plane_scene(&[5.0]);
        let lights = LightSet::new();
        let shader = Shader::new(&scene, &lights);
        let light = Vec3::new(0.0, 2.0, 0.0);
        assert_eq!(shader.visibility(light, Vec3::ZERO, 0.3, false), 1.0);
        assert_eq!(shader.visibility(light, Vec3::ZERO, 0.3, true), 1.0);
    }

    #[test]
    fn soft_visibility_is_a_tap_fraction() {
        let scene = plane_scene(&[1.0]);
        let lights = LightSet::new();
        let shader = Shader::new(&scene, &lights);
        for x in 0..12 {
            let light = Vec3::new(1.5 + x as f32 * 0.05, 2.0, 0.0);
            let v = shader.visibility(light, Vec3::new(1.9, 0.0, 0.0), 0.6, true);
            assert!((0.0..=1.0).contains(&v));
            assert_eq!((v * 4.0).fract(), 0.0);
        }
    }

    #[test]
    fn light_cutoff_is_sound() {
        let scene = StaticScene::new();
        let mut lights = LightSet::new();
        lights.add_point_light(Vec3::new(0.0, 20.0, 0.0), Color::WHITE, 1.0);
        let point = SamplePoint::prepare(Vec3::ZERO, Vec3::Y);

        let skipped = Shader::new(&scene, &lights).shade_direct(&point, true);
        let traced = Shader::new(&scene, &lights)
            .with_light_cutoff(0.0)
            .shade_direct(&point, true);
        assert_eq!(skipped.r, 0.0);
        assert!(traced.r > 0.0);
        assert!((traced.r - skipped.r).abs() <= DEFAULT_LIGHT_CUTOFF);
    }

    #[test]
    fn directional_light_below_the_surface_adds_nothing() {
        let scene = StaticScene::new();
        let mut lights = LightSet::new();
        lights.add_directional_light(Vec3::new(1.0, 0.2, 0.0), Color::WHITE, 5.0);
        let shader = Shader::new(&scene, &lights);
        let color = shader.shade_direct(&SamplePoint::prepare(Vec3::ZERO, Vec3::Y), true);
        assert_eq!(color, Color::BLACK);
    }

    #[test]
    fn direct_light_is_clamped_but_bounce_is_not() {
        let scene = StaticScene::new();
        let mut lights = LightSet::new();
        lights.add_point_light(Vec3::new(0.0, 0.5, 0.0), Color::WHITE, 50.0);
        lights.set_sky(SphericalHarmonics::uniform(Color::rgb(5.0, 5.0, 5.0)));
        let shader = Shader::new(&scene, &lights);

        let mut point = SamplePoint::prepare(Vec3::ZERO, Vec3::Y);
        let direct = shader.shade_direct(&point, false);
        assert_eq!(direct, Color::WHITE);

        let bounced = shader.shade_with_bounce(&mut point, 8, false);
        assert!(bounced.r > 1.0);
        assert_eq!(bounced.a, 1.0);
    }

    #[test]
    fn bounce_picks_up_nearby_lit_surface() {
        // Ceiling lit from above its top face, floor only sees it by bounce.
        let scene = plane_scene(&[0.0, 1.0]);
        let mut lights = LightSet::new();
        lights.set_ambient(SphericalHarmonics::uniform(Color::rgb(0.25, 0.25, 0.25)));
        let shader = Shader::new(&scene, &lights);

        let mut point = SamplePoint::prepare(Vec3::ZERO, Vec3::Y);
        let direct = shader.shade_direct(&point, false);
        let bounced = shader.shade_with_bounce(&mut point, 16, false);
        assert!(bounced.r > direct.r);
    }

    #[test]
    fn rotated_bounces_are_reproducible() {
        let scene = plane_scene(&[1.0]);
        let mut lights = LightSet::new();
        lights.set_sky(SphericalHarmonics::from_gradient(
            Color::rgb(0.2, 0.3, 0.8),
            Color::rgb(0.5, 0.5, 0.5),
            Color::BLACK,
        ));
        lights.add_point_light(Vec3::new(1.0, 0.5, 0.0), Color::WHITE, 1.0);
        let shader = Shader::new(&scene, &lights).with_rotated_bounces(true);

        let mut a = SamplePoint::prepare(Vec3::new(0.3, 0.0, 0.7), Vec3::Y);
        let mut b = a;
        let first = shader.shade_with_bounce(&mut a, 12, true);
        let second = shader.shade_with_bounce(&mut b, 12, true);
        assert_eq!(first, second);
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.seed.cursor, 1);
    }
}
