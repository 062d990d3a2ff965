//! The on-disk container of one region.
//!
//! Layout, all integers big endian:
//! - 1024 `u32` entry lengths in slot order (`z * 32 + x`), zero for empty slots. A length
//!   counts the compression byte and the payload.
//! - 1024 `u32` modification timestamps, seconds since the Unix epoch.
//! - for every present slot in slot order: one compression id byte, then the payload.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use loam_config::storage_config;

use super::compression::Compression;
use crate::{
    chunk::{ChunkParsingError, ChunkReadingError, ChunkWritingError},
    coordinates::{CHUNK_COUNT, RegionPos},
};

const TABLE_BYTES: usize = CHUNK_COUNT * 4;

pub const REGION_FILE_EXTENSION: &str = "lmr";

/// The serialized (uncompressed) payload of one slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredChunk {
    pub data: Bytes,
    pub timestamp: u32,
}

impl StoredChunk {
    pub fn new(data: Bytes) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |epoch| epoch.as_secs() as u32);
        Self { data, timestamp }
    }
}

pub type Slots = Vec<Option<StoredChunk>>;

pub fn empty_slots() -> Slots {
    vec![None; CHUNK_COUNT]
}

pub struct RegionFile {
    path: PathBuf,
}

impl RegionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_folder(folder: &Path, pos: RegionPos) -> Self {
        Self::new(folder.join(Self::file_name(pos)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(pos: RegionPos) -> String {
        format!("r.{}.{}.{}", pos.x, pos.z, REGION_FILE_EXTENSION)
    }

    /// Reverse of [`RegionFile::file_name`].
    pub fn parse_file_name(name: &str) -> Option<RegionPos> {
        let mut parts = name.split('.');
        if parts.next()? != "r" {
            return None;
        }
        let x = parts.next()?.parse().ok()?;
        let z = parts.next()?.parse().ok()?;
        if parts.next()? != REGION_FILE_EXTENSION || parts.next().is_some() {
            return None;
        }
        Some(RegionPos::new(x, z))
    }

    pub fn read(&self) -> Result<Slots, ChunkReadingError> {
        let bytes = fs::read(&self.path).map_err(|err| ChunkReadingError::IoError(err.kind()))?;
        decode(Bytes::from(bytes))
    }

    /// Rewrites the whole file with the compression from the storage configuration.
    pub fn write(&self, slots: &[Option<StoredChunk>]) -> Result<(), ChunkWritingError> {
        let config = &storage_config().chunk.compression;
        let bytes = encode(
            slots,
            Compression::from_config(config.algorithm),
            config.level,
        )?;

        let temp_path = self.path.with_extension("tmp");
        log::trace!("Writing tmp file to disk: {:?}", temp_path);
        fs::write(&temp_path, &bytes).map_err(|err| ChunkWritingError::IoError(err.kind()))?;
        // The rename replaces the old file in one step, a crash never leaves half a region
        fs::rename(&temp_path, &self.path)
            .map_err(|err| ChunkWritingError::IoError(err.kind()))?;

        log::trace!("Wrote file to Disk: {:?}", self.path);
        Ok(())
    }

    /// Deletes the file. A file that was never written is not an error.
    pub fn remove(&self) -> Result<(), ChunkWritingError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::debug!("Deleted region file {:?}", self.path);
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                log::error!("Failed to delete region file {:?}: {}", self.path, err);
                Err(ChunkWritingError::IoError(err.kind()))
            }
        }
    }
}

pub fn decode(raw: Bytes) -> Result<Slots, ChunkReadingError> {
    let mut raw_file_bytes = raw;

    if raw_file_bytes.len() < TABLE_BYTES * 2 {
        return Err(ChunkReadingError::InvalidHeader);
    }

    let headers = raw_file_bytes.split_to(TABLE_BYTES * 2);
    let (mut length_bytes, mut timestamp_bytes) = headers.split_at(TABLE_BYTES);

    let mut slots = empty_slots();
    for (index, slot) in slots.iter_mut().enumerate() {
        let length = length_bytes.get_u32() as usize;
        let timestamp = timestamp_bytes.get_u32();

        if length == 0 {
            continue;
        }
        if length > raw_file_bytes.len() {
            return Err(ChunkReadingError::ParsingError(
                ChunkParsingError::ErrorDeserializingChunk(format!(
                    "Not enough bytes available for the chunk {} ({} vs {})",
                    index,
                    length,
                    raw_file_bytes.len()
                )),
            ));
        }

        let mut entry = raw_file_bytes.split_to(length);
        let compression =
            Compression::from_byte(entry.get_u8()).map_err(ChunkReadingError::Compression)?;
        let data = match compression {
            Some(compression) => Bytes::from(
                compression
                    .decompress_data(&entry)
                    .map_err(ChunkReadingError::Compression)?,
            ),
            None => entry,
        };

        *slot = Some(StoredChunk { data, timestamp });
    }

    Ok(slots)
}

pub fn encode(
    slots: &[Option<StoredChunk>],
    compression: Option<Compression>,
    level: u32,
) -> Result<Bytes, ChunkWritingError> {
    let mut payloads = Vec::with_capacity(slots.len());
    for slot in slots {
        let payload = match (slot, compression) {
            (None, _) => None,
            (Some(chunk), Some(compression)) => Some(
                compression
                    .compress_data(&chunk.data, level)
                    .map_err(ChunkWritingError::Compression)?,
            ),
            (Some(chunk), None) => Some(chunk.data.to_vec()),
        };
        payloads.push(payload);
    }

    let body: usize = payloads.iter().flatten().map(|payload| payload.len() + 1).sum();
    let mut out = BytesMut::with_capacity(TABLE_BYTES * 2 + body);

    for payload in &payloads {
        out.put_u32(payload.as_ref().map_or(0, |payload| payload.len() as u32 + 1));
    }
    for slot in slots {
        out.put_u32(slot.as_ref().map_or(0, |chunk| chunk.timestamp));
    }
    for payload in payloads.iter().flatten() {
        out.put_u8(Compression::id(compression));
        out.put_slice(payload);
    }

    Ok(out.freeze())
}

#[cfg(test)]
mod test {
    use bytes::{BufMut, Bytes, BytesMut};
    use loam_config::{StorageConfiguration, chunk, override_config_for_testing};
    use temp_dir::TempDir;

    use super::{RegionFile, StoredChunk, TABLE_BYTES, decode, empty_slots, encode};
    use crate::{
        chunk::{ChunkReadingError, CompressionError},
        coordinates::{LocalPos, RegionPos},
        region::compression::Compression,
    };

    fn sample_slots() -> Vec<Option<StoredChunk>> {
        let mut slots = empty_slots();
        slots[LocalPos::new(0, 0).unwrap().index()] = Some(StoredChunk {
            data: Bytes::from_static(b"{\"first\":true}"),
            timestamp: 7,
        });
        slots[LocalPos::new(31, 31).unwrap().index()] = Some(StoredChunk {
            data: Bytes::from_static(b"{\"last\":true}"),
            timestamp: 9,
        });
        slots
    }

    #[test]
    fn file_names() {
        let pos = RegionPos::new(-3, 12);
        let name = RegionFile::file_name(pos);
        assert_eq!(name, "r.-3.12.lmr");
        assert_eq!(RegionFile::parse_file_name(&name), Some(pos));
        assert_eq!(RegionFile::parse_file_name("r.1.2.mca"), None);
        assert_eq!(RegionFile::parse_file_name("r.1.lmr"), None);
        assert_eq!(RegionFile::parse_file_name("r.1.2.lmr.tmp"), None);
    }

    #[test]
    fn layout_of_an_uncompressed_file() {
        let bytes = encode(&sample_slots(), None, 0).unwrap();
        let payload = b"{\"first\":true}";

        assert_eq!(&bytes[0..4], &(payload.len() as u32 + 1).to_be_bytes());
        assert_eq!(&bytes[TABLE_BYTES..TABLE_BYTES + 4], &7u32.to_be_bytes());
        assert_eq!(bytes[TABLE_BYTES * 2], Compression::NO_COMPRESSION_ID);
        assert_eq!(
            &bytes[TABLE_BYTES * 2 + 1..TABLE_BYTES * 2 + 1 + payload.len()],
            payload
        );
    }

    #[test]
    fn every_compression_decodes() {
        for compression in [
            None,
            Some(Compression::GZip),
            Some(Compression::ZLib),
            Some(Compression::Zstd),
        ] {
            let bytes = encode(&sample_slots(), compression, 3).unwrap();
            assert_eq!(decode(bytes).unwrap(), sample_slots());
        }
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(matches!(
            decode(Bytes::from_static(&[0; 16])),
            Err(ChunkReadingError::InvalidHeader)
        ));
    }

    #[test]
    fn unknown_compression_is_rejected() {
        let mut bytes = BytesMut::from(&encode(&sample_slots(), None, 0).unwrap()[..]);
        bytes[TABLE_BYTES * 2] = 42;
        assert!(matches!(
            decode(bytes.freeze()),
            Err(ChunkReadingError::Compression(
                CompressionError::UnknownCompression
            ))
        ));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let mut bytes = BytesMut::with_capacity(TABLE_BYTES * 2);
        bytes.put_u32(100);
        bytes.put_bytes(0, TABLE_BYTES * 2 - 4);
        bytes.put_slice(&[3, 1, 2]);
        assert!(matches!(
            decode(bytes.freeze()),
            Err(ChunkReadingError::ParsingError(_))
        ));
    }

    #[test]
    fn write_uses_configured_compression() {
        let mut config = StorageConfiguration::default();
        config.chunk.compression = chunk::ChunkCompression {
            algorithm: chunk::Compression::Zstd,
            level: 3,
        };
        override_config_for_testing(config);

        let dir = TempDir::new().unwrap();
        let file = RegionFile::in_folder(dir.path(), RegionPos::new(0, 0));
        file.write(&sample_slots()).unwrap();

        let raw = std::fs::read(file.path()).unwrap();
        assert_eq!(raw[TABLE_BYTES * 2], Compression::Zstd as u8);
        assert!(!file.path().with_extension("tmp").exists());
        assert_eq!(file.read().unwrap(), sample_slots());
    }
}
