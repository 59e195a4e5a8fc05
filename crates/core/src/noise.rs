//! Hash based noise.
//!
//! Every sample point derives its own [`Seed`] from its (quantized) position,
//! so parallel workers never share generator state and repeated bakes of the
//! same input produce identical numbers.

use glam::Vec3;

const BIT_NOISE1: u32 = 0x68E3_1DA4;
const BIT_NOISE2: u32 = 0xB529_7A4D;
const BIT_NOISE3: u32 = 0x1B56_C4E9;
const PRIME_Y: i32 = 198_491_317;

const SEED_WEIGHTS: Vec3 = Vec3::new(1017.0, 37000.0, 12789.0);

/// Squirrel-style integer hash: three multiply/xor-shift rounds.
pub fn hash(x: i32, seed: u32) -> u32 {
    let mut mangled = x as u32;
    mangled = mangled.wrapping_mul(BIT_NOISE1);
    mangled = mangled.wrapping_add(seed);
    mangled ^= mangled >> 8;
    mangled = mangled.wrapping_add(BIT_NOISE2);
    mangled ^= mangled << 8;
    mangled = mangled.wrapping_mul(BIT_NOISE3);
    mangled ^= mangled >> 8;
    mangled
}

pub fn hash2(x: i32, y: i32, seed: u32) -> u32 {
    hash(x.wrapping_add(y.wrapping_mul(PRIME_Y)), seed)
}

pub fn hash_f(x: i32, seed: u32) -> f32 {
    hash(x, seed) as f32 / u32::MAX as f32
}

pub fn hash2_f(x: i32, y: i32, seed: u32) -> f32 {
    hash2(x, y, seed) as f32 / u32::MAX as f32
}

/// A seed plus a cursor into its hash sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Seed {
    pub value: u32,
    pub cursor: i32,
}

impl Seed {
    pub fn new(value: u32) -> Self {
        Self { value, cursor: 0 }
    }

    /// Seed from a weighted sum of the position's components. Intended for
    /// positions that were already snapped to the shading grid.
    pub fn from_position(position: Vec3) -> Self {
        let sum = position.dot(SEED_WEIGHTS);
        Self::new(sum as i32 as u32)
    }

    pub fn next_u32(&mut self) -> u32 {
        let value = hash(self.cursor, self.value);
        self.cursor = self.cursor.wrapping_add(1);
        value
    }

    /// Next value in `[0, 1]`.
    pub fn next_f(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Next value in `min..max`; returns `min` for an empty range.
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        let span = max.wrapping_sub(min) as u32;
        let value = self.next_u32();
        if span == 0 {
            return min;
        }
        min.wrapping_add((value % span) as i32)
    }

    pub fn next_float(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f() * (max - min)
    }
}
