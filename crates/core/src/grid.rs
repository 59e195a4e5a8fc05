//! Assembles a static scene out of tile models laid over a 2D cell map.
//!
//! Every 2x2 block of neighbouring cells picks one tile model. The block is
//! read as
//!
//! ```text
//! a b      -x,-z  +x,-z
//! c d      -x,+z  +x,+z
//! ```
//!
//! and the canonical tile models are authored at rotation 0 as: corner solid
//! at `d`, edge solid along `b d`, kitty solid at `a d`, inverted corner solid
//! everywhere except `a`.

use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::material::{Material, TextureId};
use crate::mesh::{make_box, make_plane};
use crate::scene::{Model, StaticScene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Corner,
    Edge,
    Kitty,
    InvCorner,
    Full,
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileKind::Corner => "corner",
            TileKind::Edge => "edge",
            TileKind::Kitty => "kitty",
            TileKind::InvCorner => "inv_corner",
            TileKind::Full => "full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("map is empty")]
    EmptyMap,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedMap {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid cell {cell:?} at ({x}, {y})")]
    InvalidCell { x: usize, y: usize, cell: char },
    #[error("no {kind} tile for high {high} / low {low} at ({x}, {y})")]
    UnmatchedTile {
        x: usize,
        y: usize,
        kind: TileKind,
        high: u8,
        low: u8,
    },
}

/// Row-major cell values, one byte per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TileMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyMap);
        }
        if cells.len() != width * height {
            return Err(GridError::RaggedMap {
                row: cells.len() / width,
                expected: width,
                found: cells.len() % width,
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[x + y * self.width]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.cells[x + y * self.width] = value;
    }

    /// One string of digits per row.
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| char::from(b'0' + c.min(&9))).collect())
            .collect()
    }
}

/// Parses rows of digits. Blank lines and surrounding whitespace are ignored.
pub fn parse_map(text: &str) -> Result<TileMap, GridError> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let Some(first) = rows.first() else {
        return Err(GridError::EmptyMap);
    };
    let width = first.chars().count();

    let mut cells = Vec::with_capacity(width * rows.len());
    for (y, row) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(GridError::RaggedMap {
                row: y,
                expected: width,
                found,
            });
        }
        for (x, cell) in row.chars().enumerate() {
            let value = cell
                .to_digit(10)
                .ok_or(GridError::InvalidCell { x, y, cell })?;
            cells.push(value as u8);
        }
    }

    TileMap::from_cells(width, rows.len(), cells)
}

/// One tile model and the neighbourhoods it stands for. `match_low` of
/// `None` accepts any low value.
#[derive(Debug, Clone)]
pub struct TileDefinition {
    pub kind: TileKind,
    pub match_high: u8,
    pub match_low: Option<u8>,
    pub model: Arc<Model>,
}

impl TileDefinition {
    pub fn new(kind: TileKind, match_high: u8, match_low: Option<u8>, model: Arc<Model>) -> Self {
        Self {
            kind,
            match_high,
            match_low,
            model,
        }
    }

    fn matches(&self, kind: TileKind, high: u8, low: u8) -> bool {
        self.kind == kind && self.match_high == high && self.match_low.map_or(true, |m| m == low)
    }
}

#[derive(Debug, Clone)]
pub struct GridBuilder {
    tile_size: f32,
    tiles: Vec<TileDefinition>,
}

impl GridBuilder {
    pub fn new(tile_size: f32, tiles: Vec<TileDefinition>) -> Self {
        Self { tile_size, tiles }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// World position of cell `(x, y)` on a map centered on the origin.
    pub fn tile_position(&self, x: usize, y: usize, width: usize, height: usize) -> Vec3 {
        Vec3::new(
            (x as f32 - (width as f32 - 1.0) / 2.0) * self.tile_size,
            0.0,
            (y as f32 - (height as f32 - 1.0) / 2.0) * self.tile_size,
        )
    }

    /// Tile kind and Y rotation in degrees for a 2x2 block, judged by which
    /// cells hold the block's highest value.
    pub fn classify(a: u8, b: u8, c: u8, d: u8) -> (TileKind, f32) {
        let high = a.max(b).max(c).max(d);
        let id = (u8::from(a == high) << 3)
            | (u8::from(b == high) << 2)
            | (u8::from(c == high) << 1)
            | u8::from(d == high);

        match id {
            0b1000 => (TileKind::Corner, 180.0),
            0b0100 => (TileKind::Corner, 90.0),
            0b0001 => (TileKind::Corner, 0.0),
            0b0010 => (TileKind::Corner, 270.0),
            0b1010 => (TileKind::Edge, 180.0),
            0b1100 => (TileKind::Edge, 90.0),
            0b0101 => (TileKind::Edge, 0.0),
            0b0011 => (TileKind::Edge, 270.0),
            0b1001 => (TileKind::Kitty, 0.0),
            0b0110 => (TileKind::Kitty, 90.0),
            0b1110 => (TileKind::InvCorner, 180.0),
            0b1101 => (TileKind::InvCorner, 90.0),
            0b0111 => (TileKind::InvCorner, 0.0),
            0b1011 => (TileKind::InvCorner, 270.0),
            _ => (TileKind::Full, 0.0),
        }
    }

    fn definition(&self, kind: TileKind, high: u8, low: u8) -> Option<&TileDefinition> {
        self.tiles.iter().find(|def| def.matches(kind, high, low))
    }

    /// Places one tile model per 2x2 block of `map`. Fails on the first block
    /// no definition covers.
    pub fn build(&self, map: &TileMap) -> Result<StaticScene, GridError> {
        let (w, h) = (map.width(), map.height());
        let mut scene = StaticScene::new();

        for y in 0..h.saturating_sub(1) {
            for x in 0..w.saturating_sub(1) {
                let a = map.get(x, y);
                let b = map.get(x + 1, y);
                let c = map.get(x, y + 1);
                let d = map.get(x + 1, y + 1);

                let (kind, degrees) = Self::classify(a, b, c, d);
                let high = a.max(b).max(c).max(d);
                let low = a.min(b).min(c).min(d);
                let def = self
                    .definition(kind, high, low)
                    .ok_or(GridError::UnmatchedTile {
                        x,
                        y,
                        kind,
                        high,
                        low,
                    })?;

                let at = Mat4::from_rotation_translation(
                    Quat::from_rotation_y(degrees.to_radians()),
                    self.tile_position(x, y, w, h),
                );
                scene.add_model(Some(&def.model), at);
            }
        }

        tracing::debug!(width = w, height = h, instances = scene.len(), "grid assembled");
        Ok(scene)
    }
}

/// Solid quadrants `[a, b, c, d]` of each canonical tile.
fn solid_quadrants(kind: TileKind, high: u8) -> [bool; 4] {
    match kind {
        TileKind::Corner => [false, false, false, true],
        TileKind::Edge => [false, true, false, true],
        TileKind::Kitty => [true, false, false, true],
        TileKind::InvCorner => [false, true, true, true],
        TileKind::Full => [high > 0; 4],
    }
}

/// Untextured block tiles for maps of `0` (floor) and `1` (wall) cells:
/// every quadrant is either a floor quad or a wall box of `wall_height`.
pub fn block_tiles(tile_size: f32, wall_height: f32) -> Vec<TileDefinition> {
    let quarter = tile_size / 4.0;
    let floor_mesh = Arc::new(make_plane([tile_size / 2.0, tile_size / 2.0]));
    let wall_mesh = Arc::new(make_box([tile_size / 2.0, wall_height, tile_size / 2.0]));
    let floor = Arc::new(Material::lit("floor", TextureId::new("floor")));
    let wall = Arc::new(Material::lit("wall", TextureId::new("wall")));
    let centers = [
        Vec3::new(-quarter, 0.0, -quarter),
        Vec3::new(quarter, 0.0, -quarter),
        Vec3::new(-quarter, 0.0, quarter),
        Vec3::new(quarter, 0.0, quarter),
    ];

    let model = |kind: TileKind, high: u8| {
        let mut model = Model::new();
        for (center, solid) in centers.iter().zip(solid_quadrants(kind, high)) {
            model = if solid {
                model.with_node(
                    "wall",
                    Arc::clone(&wall_mesh),
                    Arc::clone(&wall),
                    Mat4::from_translation(*center + Vec3::Y * (wall_height / 2.0)),
                )
            } else {
                model.with_node(
                    "floor",
                    Arc::clone(&floor_mesh),
                    Arc::clone(&floor),
                    Mat4::from_translation(*center),
                )
            };
        }
        Arc::new(model)
    };

    vec![
        TileDefinition::new(TileKind::Full, 0, None, model(TileKind::Full, 0)),
        TileDefinition::new(TileKind::Full, 1, None, model(TileKind::Full, 1)),
        TileDefinition::new(TileKind::Corner, 1, Some(0), model(TileKind::Corner, 1)),
        TileDefinition::new(TileKind::Edge, 1, Some(0), model(TileKind::Edge, 1)),
        TileDefinition::new(TileKind::InvCorner, 1, Some(0), model(TileKind::InvCorner, 1)),
        TileDefinition::new(TileKind::Kitty, 1, Some(0), model(TileKind::Kitty, 1)),
    ]
}
