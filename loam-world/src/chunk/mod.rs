use loam_util::math::vector2::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinates::{ChunkPos, LocalPos, local_of};

pub mod block;
pub mod blocks;
pub mod chunk_ref;

pub use blocks::{BlockCollection, BlockCollectionEdge};
pub use chunk_ref::ChunkRef;

#[derive(Error, Debug)]
pub enum ChunkReadingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Failed to parse Chunk from bytes: {0}")]
    ParsingError(ChunkParsingError),
}

#[derive(Error, Debug)]
pub enum ChunkWritingError {
    #[error("Io error: {0}")]
    IoError(std::io::ErrorKind),
    #[error("Compression error {0}")]
    Compression(CompressionError),
    #[error("Chunk serializing error: {0}")]
    ChunkSerializingError(String),
    #[error("Failed to read the chunk before writing it: {0}")]
    Reading(#[from] ChunkReadingError),
    #[error("Chunk {0} was saved but could not be read back")]
    NotPersisted(ChunkPos),
}

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Compression scheme not recognised")]
    UnknownCompression,
    #[error("Error while working with zlib compression: {0}")]
    ZlibError(std::io::Error),
    #[error("Error while working with Gzip compression: {0}")]
    GZipError(std::io::Error),
    #[error("Error while working with zstd compression: {0}")]
    ZstdError(std::io::Error),
}

#[derive(Error, Debug)]
pub enum ChunkParsingError {
    #[error("Error deserializing chunk: {0}")]
    ErrorDeserializingChunk(String),
    #[error("Expected data for chunk {expected} but got it for {found}")]
    PositionMismatch { expected: ChunkPos, found: ChunkPos },
    #[error("Block grid has the wrong dimensions")]
    MalformedBlocks,
}

/// Value identity of a chunk position, used to key dirty tracking and relighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.z.wrapping_add(dz))
    }
}

impl From<ChunkPos> for ChunkKey {
    fn from(pos: ChunkPos) -> Self {
        Self::new(pos.x, pos.z)
    }
}

impl From<ChunkKey> for ChunkPos {
    fn from(key: ChunkKey) -> Self {
        Vector2::new(key.x, key.z)
    }
}

/// The payload stored in one region slot: its position and its block grid.
///
/// Cloning a chunk is a deep copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "xPos")]
    x: i32,
    #[serde(rename = "zPos")]
    z: i32,
    pub blocks: BlockCollection,
}

impl Chunk {
    /// An all air, unlit chunk.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            x: position.x,
            z: position.z,
            blocks: BlockCollection::default(),
        }
    }

    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn z(&self) -> i32 {
        self.z
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        Vector2::new(self.x, self.z)
    }

    #[inline]
    pub fn local(&self) -> LocalPos {
        local_of(&self.position())
    }

    pub fn local_x(&self) -> usize {
        self.local().x()
    }

    pub fn local_z(&self) -> usize {
        self.local().z()
    }

    /// Re-stamps the chunk with a new position. Block data is left untouched.
    pub fn set_location(&mut self, position: ChunkPos) {
        self.x = position.x;
        self.z = position.z;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkWritingError> {
        serde_json::to_vec(self)
            .map_err(|err| ChunkWritingError::ChunkSerializingError(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8], position: ChunkPos) -> Result<Self, ChunkParsingError> {
        let chunk: Self = serde_json::from_slice(bytes)
            .map_err(|err| ChunkParsingError::ErrorDeserializingChunk(err.to_string()))?;

        if chunk.position() != position {
            return Err(ChunkParsingError::PositionMismatch {
                expected: position,
                found: chunk.position(),
            });
        }
        if !chunk.blocks.is_well_formed() {
            return Err(ChunkParsingError::MalformedBlocks);
        }

        Ok(chunk)
    }
}
