use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChunkConfig {
    pub compression: ChunkCompression,
    pub format: RegionFormat,
}

impl ChunkConfig {
    pub(crate) fn validate(&self) {
        let max = self.compression.algorithm.max_level();
        assert!(
            self.compression.level <= max,
            "Compression level must be at most {max} for {:?}",
            self.compression.algorithm
        );
    }
}

#[derive(Deserialize, Serialize)]
pub struct ChunkCompression {
    pub algorithm: Compression,
    pub level: u32,
}

impl Default for ChunkCompression {
    fn default() -> Self {
        Self {
            algorithm: Compression::ZLib,
            level: 6,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// GZip Compression
    GZip,
    /// ZLib Compression
    ZLib,
    /// Zstandard Compression
    Zstd,
    /// Chunks are stored as they are serialized
    None,
}

impl Compression {
    fn max_level(self) -> u32 {
        match self {
            Self::GZip | Self::ZLib => 9,
            Self::Zstd => 22,
            Self::None => 0,
        }
    }
}

/// Where regions live.
#[derive(Deserialize, Serialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum RegionFormat {
    /// One region file per region inside the world's region folder
    #[default]
    Folder,
    /// Regions are kept in memory and discarded on exit
    Memory,
}
