use std::path::Path;

use anyhow::Context;
use glam::Mat4;
use serde::Serialize;
use vertexbake_core::{BakeStats, BakedBatch, DrawTarget, Material, Mesh, Vertex};

/// Collects whatever a baked scene submits for drawing into a JSON document.
#[derive(Debug, Default, Serialize)]
pub struct BakeOutput {
    pub stats: Option<StatsOutput>,
    pub batches: Vec<BatchOutput>,
    /// Source meshes drawn because nothing was baked.
    pub unbaked_meshes: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsOutput {
    pub batches: usize,
    pub instances: usize,
    pub vertices: usize,
    pub indices: usize,
    pub elapsed_ms: u128,
}

impl From<&BakeStats> for StatsOutput {
    fn from(stats: &BakeStats) -> Self {
        Self {
            batches: stats.batches,
            instances: stats.instances,
            vertices: stats.vertices,
            indices: stats.indices,
            elapsed_ms: stats.elapsed.as_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub material: Material,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl DrawTarget for BakeOutput {
    fn draw_source(&mut self, _mesh: &Mesh, _material: &Material, _transform: Mat4) {
        self.unbaked_meshes += 1;
    }

    fn draw_baked(&mut self, batch: &BakedBatch) {
        self.batches.push(BatchOutput {
            material: (*batch.material).clone(),
            vertices: batch.mesh.vertices().to_vec(),
            indices: batch.mesh.indices().to_vec(),
        });
    }
}

impl BakeOutput {
    pub fn with_stats(stats: &BakeStats) -> Self {
        Self {
            stats: Some(stats.into()),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serialize bake output")
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)
            .with_context(|| format!("write bake output to {}", path.display()))?;
        tracing::info!("wrote {} batches to {:?}", self.batches.len(), path);
        Ok(())
    }
}
