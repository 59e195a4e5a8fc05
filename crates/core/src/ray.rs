use glam::{Mat4, Vec3};

/// A ray with an origin and an unnormalized direction.
///
/// Shadow rays keep the full vector toward their target as the direction, so
/// `t == 1.0` lands exactly on the light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub position: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.position + self.direction * t
    }

    /// Moves the ray into the space described by `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            position: matrix.transform_point3(self.position),
            direction: matrix.transform_vector3(self.direction),
        }
    }
}

/// Closest intersection of a ray with some geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub position: Vec3,
    /// Unit surface normal, facing back toward the ray origin.
    pub normal: Vec3,
    pub t: f32,
}
