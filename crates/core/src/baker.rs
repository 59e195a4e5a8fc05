use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;
use crate::draw::DrawTarget;
use crate::light::LightSet;
use crate::material::{Material, TextureId};
use crate::ray::{Ray, RayHit};
use crate::scene::{MeshInstance, StaticScene};
use crate::shade::{SamplePoint, Shader, DEFAULT_LIGHT_CUTOFF};
use crate::sh::SphericalHarmonics;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    /// Hemisphere samples per vertex for the indirect bounce; 0 disables it.
    pub bounce_samples: u32,
    pub soft_shadows: bool,
    pub light_cutoff: f32,
    pub rotate_bounce_samples: bool,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            bounce_samples: 0,
            soft_shadows: true,
            light_cutoff: DEFAULT_LIGHT_CUTOFF,
            rotate_bounce_samples: false,
        }
    }
}

impl BakeSettings {
    /// Direct light with hard shadows only.
    pub fn preview() -> Self {
        Self {
            bounce_samples: 0,
            soft_shadows: false,
            ..Self::default()
        }
    }

    pub fn with_bounce_samples(mut self, samples: u32) -> Self {
        self.bounce_samples = samples;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BakeError {
    #[error("a bake is already in progress")]
    AlreadyBaking,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: Color,
}

/// Finalized geometry of one batch. Read-only and cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct BakedMesh {
    vertices: Arc<[Vertex]>,
    indices: Arc<[u32]>,
}

impl BakedMesh {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// All baked geometry sharing one output material.
#[derive(Debug, Clone)]
pub struct BakedBatch {
    pub material: Arc<Material>,
    pub mesh: BakedMesh,
}

/// Bake flag and progress, shared with whoever watches the bake.
#[derive(Debug, Default)]
pub struct BakeState {
    baking: AtomicBool,
    progress: AtomicU32,
}

impl BakeState {
    pub fn baking(&self) -> bool {
        self.baking.load(Ordering::Acquire)
    }

    /// Fraction of vertices shaded, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    fn begin(&self) -> bool {
        if self
            .baking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.progress.store(0.0f32.to_bits(), Ordering::Relaxed);
        true
    }

    /// Raises progress to `value`; lower values are ignored. Bit patterns of
    /// non-negative floats order like the floats themselves.
    fn advance(&self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        self.progress.fetch_max(value.to_bits(), Ordering::Relaxed);
    }

    fn finish(&self) {
        self.progress.store(1.0f32.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakeStats {
    pub batches: usize,
    pub instances: usize,
    pub vertices: usize,
    pub indices: usize,
    pub elapsed: Duration,
}

/// Where one instance lands inside its batch.
#[derive(Debug, Clone, Copy)]
struct Placement {
    instance: usize,
    batch: usize,
    vertex_offset: usize,
    index_offset: usize,
}

#[derive(Debug)]
struct BatchBuffers {
    material: Arc<Material>,
    vertex_count: usize,
    index_count: usize,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

/// Batch layout for one bake: which instances go where, and how large every
/// batch ends up.
#[derive(Debug, Default)]
struct BatchPlan {
    batches: Vec<BatchBuffers>,
    placements: Vec<Placement>,
    total_vertices: usize,
    total_indices: usize,
}

impl BatchPlan {
    fn new(scene: &StaticScene) -> Self {
        let mut plan = Self::default();
        let mut by_texture: HashMap<TextureId, usize> = HashMap::new();

        for (index, instance) in scene.instances().iter().enumerate() {
            if !instance.visible {
                continue;
            }
            let texture = &instance.material.diffuse;
            let batch = match by_texture.get(texture) {
                Some(batch) => *batch,
                None => {
                    plan.batches.push(BatchBuffers {
                        material: Arc::new(Material::unlit(texture.clone())),
                        vertex_count: 0,
                        index_count: 0,
                        vertices: Vec::new(),
                        indices: Vec::new(),
                    });
                    by_texture.insert(texture.clone(), plan.batches.len() - 1);
                    plan.batches.len() - 1
                }
            };

            let buffers = &mut plan.batches[batch];
            plan.placements.push(Placement {
                instance: index,
                batch,
                vertex_offset: buffers.vertex_count,
                index_offset: buffers.index_count,
            });
            buffers.vertex_count += instance.mesh.vertex_count();
            buffers.index_count += instance.mesh.index_count();
            plan.total_vertices += instance.mesh.vertex_count();
            plan.total_indices += instance.mesh.index_count();
        }

        plan
    }

    fn allocate(&mut self) {
        for batch in &mut self.batches {
            batch.vertices = vec![Vertex::default(); batch.vertex_count];
            batch.indices = vec![0; batch.index_count];
        }
    }

    fn populate(
        &mut self,
        scene: &StaticScene,
        shader: &Shader<'_>,
        settings: &BakeSettings,
        state: &BakeState,
    ) {
        let total = self.total_vertices;
        let mut done = 0usize;

        for placement in &self.placements {
            let instance = &scene.instances()[placement.instance];
            let batch = &mut self.batches[placement.batch];
            let count = instance.mesh.vertex_count();

            let target =
                &mut batch.vertices[placement.vertex_offset..placement.vertex_offset + count];
            bake_instance(instance, target, shader, settings);

            let base = placement.vertex_offset as u32;
            let index_target = &mut batch.indices
                [placement.index_offset..placement.index_offset + instance.mesh.index_count()];
            for (dst, src) in index_target.iter_mut().zip(&instance.mesh.indices) {
                *dst = src + base;
            }

            done += count;
            state.advance((done as f64 / total as f64) as f32);
        }
    }

    fn finalize(self) -> Vec<BakedBatch> {
        self.batches
            .into_iter()
            .map(|batch| BakedBatch {
                material: batch.material,
                mesh: BakedMesh {
                    vertices: batch.vertices.into(),
                    indices: batch.indices.into(),
                },
            })
            .collect()
    }
}

/// Shades every vertex of `instance` into `target`, in parallel.
fn bake_instance(
    instance: &MeshInstance,
    target: &mut [Vertex],
    shader: &Shader<'_>,
    settings: &BakeSettings,
) {
    let transform: Mat4 = instance.transform();
    let normal_transform = instance.normal_transform();
    let mesh = &instance.mesh;

    target
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, out)| {
            let position = transform.transform_point3(Vec3::from(mesh.positions[index]));
            let normal = normal_transform
                .transform_vector3(mesh.normal(index))
                .normalize_or_zero();

            let mut point = SamplePoint::prepare(position, normal);
            let color =
                shader.shade_with_bounce(&mut point, settings.bounce_samples, settings.soft_shadows);

            *out = Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                color,
            };
        });
}

/// Holds the baking flag for one bake. Dropping it clears the flag, so a bake
/// that unwinds does not leave the scene stuck in the baking state.
struct BakeGuard<'a> {
    state: &'a BakeState,
}

impl<'a> BakeGuard<'a> {
    fn begin(state: &'a BakeState) -> Option<Self> {
        state.begin().then_some(Self { state })
    }
}

impl Drop for BakeGuard<'_> {
    fn drop(&mut self) {
        self.state.baking.store(false, Ordering::Release);
    }
}

/// Lights, the scene being lit and the result of the most recent bake.
///
/// Baking goes through `&self`, so a worker thread can bake while the host
/// keeps drawing and raycasting the same instance.
#[derive(Debug, Default)]
pub struct BakedScene {
    lights: LightSet,
    scene: RwLock<Option<Arc<StaticScene>>>,
    batches: RwLock<Option<Arc<[BakedBatch]>>>,
    state: Arc<BakeState>,
}

impl BakedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point_light(&mut self, at: Vec3, color: Color, intensity: f32) {
        self.lights.add_point_light(at, color, intensity);
    }

    pub fn add_directional_light(&mut self, direction: Vec3, color: Color, intensity: f32) {
        self.lights.add_directional_light(direction, color, intensity);
    }

    pub fn set_ambient(&mut self, ambient: SphericalHarmonics) {
        self.lights.set_ambient(ambient);
    }

    pub fn set_sky(&mut self, sky: SphericalHarmonics) {
        self.lights.set_sky(sky);
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear_lights();
    }

    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut LightSet {
        &mut self.lights
    }

    /// Handle for watching a bake from another thread.
    pub fn state(&self) -> Arc<BakeState> {
        Arc::clone(&self.state)
    }

    pub fn baking(&self) -> bool {
        self.state.baking()
    }

    pub fn progress(&self) -> f32 {
        self.state.progress()
    }

    /// Shows `scene` unbaked and drops batches baked from the previous one.
    pub fn set_scene(&self, scene: Arc<StaticScene>) -> Result<(), BakeError> {
        if self.state.baking() {
            return Err(BakeError::AlreadyBaking);
        }
        *self.scene.write() = Some(scene);
        *self.batches.write() = None;
        Ok(())
    }

    pub fn scene(&self) -> Option<Arc<StaticScene>> {
        self.scene.read().clone()
    }

    pub fn is_baked(&self) -> bool {
        self.batches.read().is_some()
    }

    /// Batches of the latest finished bake; empty before the first one.
    pub fn batches(&self) -> Arc<[BakedBatch]> {
        self.batches
            .read()
            .clone()
            .unwrap_or_else(|| Vec::new().into())
    }

    /// Bakes direct and indirect light into the vertex colors of every
    /// visible instance of `scene`, one batch per diffuse texture. Batches of
    /// the previous bake stay visible until this one finishes.
    pub fn bake(
        &self,
        scene: Arc<StaticScene>,
        settings: &BakeSettings,
    ) -> Result<BakeStats, BakeError> {
        let Some(_guard) = BakeGuard::begin(&self.state) else {
            tracing::warn!("bake requested while another bake is running");
            return Err(BakeError::AlreadyBaking);
        };
        let start = Instant::now();
        tracing::info!(
            instances = scene.len(),
            lights = self.lights.len(),
            bounce_samples = settings.bounce_samples,
            soft_shadows = settings.soft_shadows,
            "bake started"
        );
        *self.scene.write() = Some(Arc::clone(&scene));

        let mut plan = BatchPlan::new(&scene);
        tracing::debug!(
            batches = plan.batches.len(),
            vertices = plan.total_vertices,
            indices = plan.total_indices,
            "bake planned"
        );
        plan.allocate();

        if plan.total_vertices == 0 {
            self.state.advance(1.0);
        } else {
            let shader = Shader::new(&scene, &self.lights)
                .with_light_cutoff(settings.light_cutoff)
                .with_rotated_bounces(settings.rotate_bounce_samples);
            plan.populate(&scene, &shader, settings, &self.state);
        }

        let stats = BakeStats {
            batches: plan.batches.len(),
            instances: plan.placements.len(),
            vertices: plan.total_vertices,
            indices: plan.total_indices,
            elapsed: start.elapsed(),
        };
        *self.batches.write() = Some(plan.finalize().into());
        self.state.finish();

        tracing::info!(
            batches = stats.batches,
            vertices = stats.vertices,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "bake finished"
        );
        Ok(stats)
    }

    /// Ray query against the current scene.
    pub fn raycast(&self, world_ray: &Ray) -> Option<RayHit> {
        self.scene()?.raycast(world_ray)
    }

    /// Draws the latest baked batches, or the source scene when nothing has
    /// been baked for it yet.
    pub fn draw(&self, target: &mut impl DrawTarget) {
        let batches = self.batches.read().clone();
        if let Some(batches) = batches {
            for batch in batches.iter() {
                target.draw_baked(batch);
            }
        } else if let Some(scene) = self.scene() {
            scene.draw(target);
        }
    }
}
