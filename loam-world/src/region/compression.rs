use std::io::Read;

use flate2::read::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};

use crate::chunk::CompressionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    /// GZip Compression
    GZip = Self::GZIP_ID,
    /// ZLib Compression
    ZLib = Self::ZLIB_ID,
    /// Zstandard Compression
    Zstd = Self::ZSTD_ID,
}

impl Compression {
    const GZIP_ID: u8 = 1;
    const ZLIB_ID: u8 = 2;
    pub const NO_COMPRESSION_ID: u8 = 3;
    const ZSTD_ID: u8 = 5;

    pub fn decompress_data(&self, compressed_data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        match self {
            Compression::GZip => {
                let mut decoder = GzDecoder::new(compressed_data);
                let mut chunk_data = Vec::new();
                decoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::GZipError)?;
                Ok(chunk_data)
            }
            Compression::ZLib => {
                let mut decoder = ZlibDecoder::new(compressed_data);
                let mut chunk_data = Vec::new();
                decoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::ZlibError)?;
                Ok(chunk_data)
            }
            Compression::Zstd => {
                zstd::decode_all(compressed_data).map_err(CompressionError::ZstdError)
            }
        }
    }

    pub fn compress_data(
        &self,
        uncompressed_data: &[u8],
        compression_level: u32,
    ) -> Result<Vec<u8>, CompressionError> {
        match self {
            Compression::GZip => {
                let mut encoder = GzEncoder::new(
                    uncompressed_data,
                    flate2::Compression::new(compression_level),
                );
                let mut chunk_data = Vec::new();
                encoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::GZipError)?;
                Ok(chunk_data)
            }
            Compression::ZLib => {
                let mut encoder = ZlibEncoder::new(
                    uncompressed_data,
                    flate2::Compression::new(compression_level),
                );
                let mut chunk_data = Vec::new();
                encoder
                    .read_to_end(&mut chunk_data)
                    .map_err(CompressionError::ZlibError)?;
                Ok(chunk_data)
            }
            Compression::Zstd => zstd::encode_all(uncompressed_data, compression_level as i32)
                .map_err(CompressionError::ZstdError),
        }
    }

    /// `Ok(None)` stands for uncompressed data.
    pub fn from_byte(byte: u8) -> Result<Option<Self>, CompressionError> {
        match byte {
            Self::GZIP_ID => Ok(Some(Self::GZip)),
            Self::ZLIB_ID => Ok(Some(Self::ZLib)),
            Self::NO_COMPRESSION_ID => Ok(None),
            Self::ZSTD_ID => Ok(Some(Self::Zstd)),
            _ => Err(CompressionError::UnknownCompression),
        }
    }

    pub fn id(compression: Option<Self>) -> u8 {
        compression.map_or(Self::NO_COMPRESSION_ID, |c| c as u8)
    }

    pub fn from_config(value: loam_config::chunk::Compression) -> Option<Self> {
        match value {
            loam_config::chunk::Compression::GZip => Some(Self::GZip),
            loam_config::chunk::Compression::ZLib => Some(Self::ZLib),
            loam_config::chunk::Compression::Zstd => Some(Self::Zstd),
            loam_config::chunk::Compression::None => None,
        }
    }
}
