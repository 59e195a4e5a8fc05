use glam::Mat4;

use crate::baker::BakedBatch;
use crate::material::Material;
use crate::mesh::Mesh;

/// Host render loop seam. Implemented by whatever draws frames; the baker
/// only decides what gets submitted.
pub trait DrawTarget {
    /// Unbaked source geometry, lit by the host.
    fn draw_source(&mut self, mesh: &Mesh, material: &Material, transform: Mat4);

    /// A finalized bake batch, already in world space with lighting in its
    /// vertex colors.
    fn draw_baked(&mut self, batch: &BakedBatch);
}
