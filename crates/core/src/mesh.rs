use glam::Vec3;

use crate::ray::{Ray, RayHit};

const DET_EPSILON: f32 = 1e-12;
const MIN_HIT_DISTANCE: f32 = 1e-5;
const BOUNDS_PADDING: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    /// Slab test against the full (unbounded) ray.
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        let min = Vec3::from(self.min) - Vec3::splat(BOUNDS_PADDING);
        let max = Vec3::from(self.max) + Vec3::splat(BOUNDS_PADDING);
        let inv = ray.direction.recip();
        let t1 = (min - ray.position) * inv;
        let t2 = (max - ray.position) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        t_far >= t_near.max(0.0)
    }
}

/// Indexed triangle mesh in its own local space.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub normals: Option<Vec<[f32; 3]>>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Normal of vertex `index`, +Y when the mesh carries none.
    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals
            .as_ref()
            .and_then(|normals| normals.get(index))
            .map(|n| Vec3::from(*n))
            .unwrap_or(Vec3::Y)
    }

    /// Local space bounds, `None` for a mesh without positions.
    pub fn bounds(&self) -> Option<Aabb> {
        let first = Vec3::from(*self.positions.first()?);
        let (min, max) = self
            .positions
            .iter()
            .map(|p| Vec3::from(*p))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Aabb {
            min: min.to_array(),
            max: max.to_array(),
        })
    }

    /// Closest triangle hit in local space. Triangles are two-sided; the
    /// returned normal is the face normal turned toward the ray origin.
    pub fn intersect(&self, ray: &Ray) -> Option<RayHit> {
        let dir_len = ray.direction.length();
        if dir_len <= 0.0 {
            return None;
        }
        let min_t = MIN_HIT_DISTANCE / dir_len;

        let mut best: Option<(f32, Vec3)> = None;
        for tri in self.indices.chunks_exact(3) {
            let (Some(p0), Some(p1), Some(p2)) = (
                self.positions.get(tri[0] as usize),
                self.positions.get(tri[1] as usize),
                self.positions.get(tri[2] as usize),
            ) else {
                continue;
            };
            let p0 = Vec3::from(*p0);
            let e1 = Vec3::from(*p1) - p0;
            let e2 = Vec3::from(*p2) - p0;

            let pvec = ray.direction.cross(e2);
            let det = e1.dot(pvec);
            if det.abs() < DET_EPSILON {
                continue;
            }
            let inv_det = 1.0 / det;

            let tvec = ray.position - p0;
            let u = tvec.dot(pvec) * inv_det;
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let qvec = tvec.cross(e1);
            let v = ray.direction.dot(qvec) * inv_det;
            if v < 0.0 || u + v > 1.0 {
                continue;
            }

            let t = e2.dot(qvec) * inv_det;
            if t <= min_t {
                continue;
            }
            if best.map_or(true, |(best_t, _)| t < best_t) {
                best = Some((t, e1.cross(e2)));
            }
        }

        let (t, face) = best?;
        let mut normal = face.normalize_or_zero();
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }
        Some(RayHit {
            position: ray.at(t),
            normal,
            t,
        })
    }
}

/// Axis-aligned box with per-face normals, centered on the origin.
pub fn make_box(size: [f32; 3]) -> Mesh {
    let h = Vec3::from(size) * 0.5;
    make_box_at((-h).to_array(), h.to_array())
}

/// Axis-aligned box spanning `min..max`, 24 vertices so each face keeps a
/// flat normal.
pub fn make_box_at(min: [f32; 3], max: [f32; 3]) -> Mesh {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = max;

    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[x0, y0, z1], [x1, y0, z1], [x1, y1, z1], [x0, y1, z1]]),
        ([0.0, 0.0, -1.0], [[x1, y0, z0], [x0, y0, z0], [x0, y1, z0], [x1, y1, z0]]),
        ([1.0, 0.0, 0.0], [[x1, y0, z1], [x1, y0, z0], [x1, y1, z0], [x1, y1, z1]]),
        ([-1.0, 0.0, 0.0], [[x0, y0, z0], [x0, y0, z1], [x0, y1, z1], [x0, y1, z0]]),
        ([0.0, 1.0, 0.0], [[x0, y1, z1], [x1, y1, z1], [x1, y1, z0], [x0, y1, z0]]),
        ([0.0, -1.0, 0.0], [[x0, y0, z0], [x1, y0, z0], [x1, y0, z1], [x0, y0, z1]]),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = positions.len() as u32;
        positions.extend_from_slice(&corners);
        normals.extend_from_slice(&[normal; 4]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh {
        positions,
        indices,
        normals: Some(normals),
    }
}

/// Single +Y facing quad in the XZ plane.
pub fn make_plane(size: [f32; 2]) -> Mesh {
    let w = size[0] * 0.5;
    let d = size[1] * 0.5;
    Mesh {
        positions: vec![[-w, 0.0, -d], [w, 0.0, -d], [w, 0.0, d], [-w, 0.0, d]],
        indices: vec![0, 2, 1, 0, 3, 2],
        normals: Some(vec![[0.0, 1.0, 0.0]; 4]),
    }
}

/// Flat +Y grid of `divisions` quads in the XZ plane, centered on the origin.
pub fn make_grid(size: [f32; 2], divisions: [u32; 2]) -> Mesh {
    let [cols, rows] = divisions.map(|d| d.max(1));
    let extent = Vec3::new(size[0].max(0.0), 0.0, size[1].max(0.0));
    let corner = -extent * 0.5;

    let positions: Vec<[f32; 3]> = (0..=rows)
        .flat_map(|row| (0..=cols).map(move |col| (col, row)))
        .map(|(col, row)| {
            let t = Vec3::new(col as f32 / cols as f32, 0.0, row as f32 / rows as f32);
            (corner + extent * t).to_array()
        })
        .collect();

    let stride = cols + 1;
    let indices = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| row * stride + col))
        .flat_map(|i| [i, i + stride, i + 1, i + 1, i + stride, i + stride + 1])
        .collect();

    Mesh {
        normals: Some(vec![[0.0, 1.0, 0.0]; positions.len()]),
        positions,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_offset_box() {
        let mesh = make_box_at([1.0, -2.0, 0.5], [3.0, 4.0, 2.0]);
        let bounds = mesh.bounds().expect("bounds");
        assert_eq!(bounds.min, [1.0, -2.0, 0.5]);
        assert_eq!(bounds.max, [3.0, 4.0, 2.0]);
        assert!(Mesh::new().bounds().is_none());
    }

    #[test]
    fn box_has_expected_counts() {
        let mesh = make_box([2.0, 2.0, 2.0]);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
    }

    #[test]
    fn grid_has_expected_counts() {
        let mesh = make_grid([2.0, 2.0], [2, 3]);
        assert_eq!(mesh.positions.len(), (2 + 1) * (3 + 1));
        assert_eq!(mesh.indices.len(), 2 * 3 * 6);
        assert!((0..mesh.vertex_count()).all(|i| mesh.normal(i) == Vec3::Y));
        assert_eq!(mesh.positions[0], [-1.0, 0.0, -1.0]);
        assert_eq!(mesh.positions[11], [1.0, 0.0, 1.0]);
        let hit = mesh
            .intersect(&Ray::new(Vec3::new(0.3, 1.0, -0.6), Vec3::NEG_Y))
            .expect("hit");
        assert!(hit.normal.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn plane_is_hit_from_both_sides() {
        let plane = make_plane([2.0, 2.0]);
        let down = plane
            .intersect(&Ray::new(Vec3::new(0.2, 3.0, 0.1), Vec3::NEG_Y))
            .expect("hit from above");
        assert!((down.t - 3.0).abs() < 1e-5);
        assert!(down.normal.abs_diff_eq(Vec3::Y, 1e-5));

        let up = plane
            .intersect(&Ray::new(Vec3::new(0.2, -1.0, 0.1), Vec3::Y))
            .expect("hit from below");
        assert!(up.normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn intersect_reports_closest_triangle() {
        let mesh = make_box([1.0, 1.0, 1.0]);
        let hit = mesh
            .intersect(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -2.0)))
            .expect("hit");
        assert!((hit.position.z - 0.5).abs() < 1e-5);
        assert!(hit.normal.abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn intersect_ignores_hits_behind_origin() {
        let plane = make_plane([2.0, 2.0]);
        assert!(plane
            .intersect(&Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y))
            .is_none());
    }

    #[test]
    fn aabb_slab_test() {
        let bounds = make_box([1.0, 1.0, 1.0]).bounds().expect("bounds");
        assert!(bounds.intersects_ray(&Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::NEG_Y)));
        assert!(!bounds.intersects_ray(&Ray::new(Vec3::new(3.0, 5.0, 0.0), Vec3::NEG_Y)));
        assert!(!bounds.intersects_ray(&Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y)));
    }
}
