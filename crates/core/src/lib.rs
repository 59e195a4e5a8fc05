mod baker;
mod color;
mod draw;
mod grid;
mod light;
mod material;
mod mesh;
mod noise;
mod project;
mod ray;
mod scene;
mod sh;
mod shade;

pub use baker::{
    BakeError, BakeSettings, BakeState, BakeStats, BakedBatch, BakedMesh, BakedScene, Vertex,
};
pub use color::Color;
pub use draw::DrawTarget;
pub use grid::{block_tiles, parse_map, GridBuilder, GridError, TileDefinition, TileKind, TileMap};
pub use light::{Light, LightSet};
pub use material::{Material, Shading, TextureId};
pub use mesh::{make_box, make_box_at, make_grid, make_plane, Aabb, Mesh};
pub use noise::{hash, hash2, hash2_f, hash_f, Seed};
pub use project::{
    BakeProject, Environment, MapLight, SunLight, TileSettings, MAP_LIGHT_OFFSET, PROJECT_VERSION,
};
pub use ray::{Ray, RayHit};
pub use scene::{
    InstanceFlags, MeshInstance, Model, ModelNode, StaticScene, INTANGIBLE_MARKER,
    INVISIBLE_MARKER,
};
pub use sh::SphericalHarmonics;
pub use shade::{
    hammersley, quantize, radical_inverse, sample_hemisphere_uniform, SamplePoint, Shader,
    DEFAULT_LIGHT_CUTOFF, QUANTIZE_SCALE, SURFACE_OFFSET,
};
