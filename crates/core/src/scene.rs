use std::sync::Arc;

use glam::Mat4;

use crate::draw::DrawTarget;
use crate::material::Material;
use crate::mesh::{Aabb, Mesh};
use crate::ray::{Ray, RayHit};

/// Node name marker: drawn nowhere, still blocks rays.
pub const INVISIBLE_MARKER: &str = "[invisible]";
/// Node name marker: drawn, but rays pass through.
pub const INTANGIBLE_MARKER: &str = "[intangible]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceFlags {
    pub visible: bool,
    pub solid: bool,
}

impl Default for InstanceFlags {
    fn default() -> Self {
        Self {
            visible: true,
            solid: true,
        }
    }
}

impl InstanceFlags {
    pub fn from_name(name: &str) -> Self {
        Self {
            visible: !name.contains(INVISIBLE_MARKER),
            solid: !name.contains(INTANGIBLE_MARKER),
        }
    }
}

/// One node of a loaded model.
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub mesh: Option<Arc<Mesh>>,
    pub material: Arc<Material>,
    pub transform: Mat4,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub nodes: Vec<ModelNode>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(
        mut self,
        name: impl Into<String>,
        mesh: Arc<Mesh>,
        material: Arc<Material>,
        transform: Mat4,
    ) -> Self {
        self.nodes.push(ModelNode {
            name: name.into(),
            mesh: Some(mesh),
            material,
            transform,
        });
        self
    }
}

/// A mesh placed in the world. Never mutated once added to a scene.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub name: String,
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
    transform: Mat4,
    inv_transform: Mat4,
    normal_transform: Mat4,
    local_bounds: Option<Aabb>,
    pub visible: bool,
    pub solid: bool,
}

impl MeshInstance {
    fn new(
        name: String,
        mesh: Arc<Mesh>,
        material: Arc<Material>,
        transform: Mat4,
        flags: InstanceFlags,
    ) -> Self {
        let inv_transform = transform.inverse();
        Self {
            name,
            local_bounds: mesh.bounds(),
            mesh,
            material,
            transform,
            inv_transform,
            normal_transform: inv_transform.transpose(),
            visible: flags.visible,
            solid: flags.solid,
        }
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn inv_transform(&self) -> Mat4 {
        self.inv_transform
    }

    /// Inverse transpose of the transform, for normals.
    pub fn normal_transform(&self) -> Mat4 {
        self.normal_transform
    }

    /// World space hit, or `None` when the instance is not solid or missed.
    pub fn raycast(&self, world_ray: &Ray) -> Option<RayHit> {
        if !self.solid {
            return None;
        }
        let local_ray = world_ray.transformed(&self.inv_transform);
        if let Some(bounds) = &self.local_bounds {
            if !bounds.intersects_ray(&local_ray) {
                return None;
            }
        }
        let local = self.mesh.intersect(&local_ray)?;
        Some(RayHit {
            position: self.transform.transform_point3(local.position),
            normal: self
                .normal_transform
                .transform_vector3(local.normal)
                .normalize_or_zero(),
            t: local.t,
        })
    }
}

/// Immutable set of mesh instances that answers closest-hit ray queries.
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    instances: Vec<MeshInstance>,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one instance. A missing mesh is ignored.
    pub fn add_instance(
        &mut self,
        mesh: Option<Arc<Mesh>>,
        material: Arc<Material>,
        transform: Mat4,
        flags: InstanceFlags,
    ) {
        let Some(mesh) = mesh else {
            return;
        };
        self.instances.push(MeshInstance::new(
            String::new(),
            mesh,
            material,
            transform,
            flags,
        ));
    }

    /// Adds every meshed node of `model`, placed at `at`. Flags come from the
    /// node names.
    pub fn add_model(&mut self, model: Option<&Model>, at: Mat4) {
        let Some(model) = model else {
            return;
        };
        for node in &model.nodes {
            let Some(mesh) = &node.mesh else {
                continue;
            };
            self.instances.push(MeshInstance::new(
                node.name.clone(),
                Arc::clone(mesh),
                Arc::clone(&node.material),
                at * node.transform,
                InstanceFlags::from_name(&node.name),
            ));
        }
    }

    pub fn instances(&self) -> &[MeshInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Closest hit over all solid instances.
    pub fn raycast(&self, world_ray: &Ray) -> Option<RayHit> {
        self.raycast_instance(world_ray).map(|(_, hit)| hit)
    }

    /// Like [`StaticScene::raycast`], also returning the index of the instance
    /// that was hit. On exactly equal distances the instance added first wins.
    pub fn raycast_instance(&self, world_ray: &Ray) -> Option<(usize, RayHit)> {
        let mut closest: Option<(f32, usize, RayHit)> = None;
        for (index, instance) in self.instances.iter().enumerate() {
            let Some(hit) = instance.raycast(world_ray) else {
                continue;
            };
            let dist = hit.position.distance_squared(world_ray.position);
            if closest.map_or(true, |(best, _, _)| dist < best) {
                closest = Some((dist, index, hit));
            }
        }
        closest.map(|(_, index, hit)| (index, hit))
    }

    /// Draws the visible instances with their source materials.
    pub fn draw(&self, target: &mut impl DrawTarget) {
        for instance in self.instances.iter().filter(|i| i.visible) {
            target.draw_source(&instance.mesh, &instance.material, instance.transform);
        }
    }
}
