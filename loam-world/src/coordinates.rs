//! Translation between global chunk coordinates and the (region, local slot) pair that stores
//! them.
//!
//! Region coordinates are an arithmetic shift of the chunk coordinate, local coordinates are
//! its low five bits, so negative chunks land in negative regions with a local coordinate that
//! still lies in `[0, 32)`.

use std::fmt;

use loam_util::math::{ceil_log2, vector2::Vector2};
use serde::{Deserialize, Serialize};

/// The side size of a region in chunks (one region is 32x32 chunks)
pub const REGION_SIZE: usize = 32;

/// The number of bits that identify two chunks in the same region
pub const REGION_BITS: u8 = ceil_log2(REGION_SIZE as u32);

pub const REGION_MASK: i32 = i32::pow(2, REGION_BITS as u32) - 1;

/// The number of chunks in a region
pub const CHUNK_COUNT: usize = REGION_SIZE * REGION_SIZE;

/// Global position of a chunk, in chunks.
pub type ChunkPos = Vector2<i32>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

/// Position of a chunk inside its region. Both axes are in `[0, 32)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPos {
    x: u8,
    z: u8,
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for RegionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r.{}.{}", self.x, self.z)
    }
}

impl LocalPos {
    /// Returns `None` when either axis is outside of `[0, 32)`.
    pub const fn new(x: usize, z: usize) -> Option<Self> {
        if x < REGION_SIZE && z < REGION_SIZE {
            Some(Self {
                x: x as u8,
                z: z as u8,
            })
        } else {
            None
        }
    }

    pub const fn x(&self) -> usize {
        self.x as usize
    }

    pub const fn z(&self) -> usize {
        self.z as usize
    }

    /// Slot index inside the region tables, z major like the anvil location table.
    pub const fn index(&self) -> usize {
        ((self.z as usize) << REGION_BITS) + self.x as usize
    }

    /// Every slot in row major order: local x in the outer loop, local z in the inner one.
    pub fn all() -> impl Iterator<Item = LocalPos> {
        (0..REGION_SIZE as u8).flat_map(|x| (0..REGION_SIZE as u8).map(move |z| LocalPos { x, z }))
    }
}

impl fmt::Display for LocalPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

pub const fn region_of(chunk: &ChunkPos) -> RegionPos {
    RegionPos::new(chunk.x >> REGION_BITS, chunk.z >> REGION_BITS)
}

pub const fn local_of(chunk: &ChunkPos) -> LocalPos {
    LocalPos {
        x: (chunk.x & REGION_MASK) as u8,
        z: (chunk.z & REGION_MASK) as u8,
    }
}

pub const fn split(chunk: &ChunkPos) -> (RegionPos, LocalPos) {
    (region_of(chunk), local_of(chunk))
}

/// Inverse of [`split`].
pub const fn join(region: RegionPos, local: LocalPos) -> ChunkPos {
    Vector2::new(
        (region.x << REGION_BITS) | local.x as i32,
        (region.z << REGION_BITS) | local.z as i32,
    )
}
