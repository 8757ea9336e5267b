//! Pack container and index reading with delta resolution.
//!
//! A pack stores many objects back-to-back, each zlib-deflated and
//! possibly delta-compressed against another object. The companion index
//! maps ids to byte offsets for random access. This crate parses both
//! formats, applies copy/insert delta scripts, and walks whole packs
//! sequentially.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;
pub mod unpack;
pub mod varint;
mod verify;

use grist_hash::ObjectId;

pub use delta::{DeltaHunks, Hunk};
pub use entry::PackedEntry;
pub use index::PackIndex;
pub use pack::Pack;
pub use unpack::unpack_all;

/// Errors that can occur while reading packs and indices.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("invalid delta: {reason}")]
    InvalidDelta { reason: String },

    #[error("{context}: declared {declared} bytes, got {actual}")]
    SizeMismatch {
        context: &'static str,
        declared: usize,
        actual: usize,
    },

    #[error("object {0} not present in index")]
    NotIndexed(ObjectId),

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("no entry resolved at pack offset {offset}")]
    UnresolvedBaseOffset { offset: u64 },

    #[error("unsupported entry kind {kind} at offset {offset}")]
    UnsupportedEntryKind { kind: u8, offset: u64 },

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("delta chain too deep (>{max_depth} levels) at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error("pack checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("crc32 mismatch for {oid}: index has {expected:#010x}, entry hashes to {actual:#010x}")]
    Crc32Mismatch {
        oid: ObjectId,
        expected: u32,
        actual: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] grist_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] grist_hash::HashError),
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\xfftOc"
pub const IDX_VERSION: u32 = 2;

/// Pack versions this reader accepts.
pub const SUPPORTED_PACK_VERSIONS: [u32; 2] = [2, 3];

/// Bound on delta chain length; a well-formed pack stays far below this,
/// and exceeding it is reported rather than recursed into.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 512;

/// Parse and validate a pack header, returning `(version, object_count)`.
pub(crate) fn parse_pack_header(data: &[u8]) -> Result<(u32, u32), PackError> {
    if data.len() < PACK_HEADER_SIZE {
        return Err(PackError::InvalidHeader("file too small".into()));
    }
    if &data[0..4] != PACK_SIGNATURE {
        return Err(PackError::InvalidHeader("bad PACK signature".into()));
    }
    let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if !SUPPORTED_PACK_VERSIONS.contains(&version) {
        return Err(PackError::UnsupportedVersion(version));
    }
    let count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    Ok((version, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_versions_2_and_3_accepted() {
        for version in [2u32, 3] {
            let mut data = Vec::new();
            data.extend_from_slice(PACK_SIGNATURE);
            data.extend_from_slice(&version.to_be_bytes());
            data.extend_from_slice(&7u32.to_be_bytes());
            assert_eq!(parse_pack_header(&data).unwrap(), (version, 7));
        }
    }

    #[test]
    fn header_version_4_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(PACK_SIGNATURE);
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            parse_pack_header(&data).unwrap_err(),
            PackError::UnsupportedVersion(4)
        ));
    }

    #[test]
    fn header_bad_magic_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(b"KCAP");
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            parse_pack_header(&data).unwrap_err(),
            PackError::InvalidHeader(_)
        ));
    }

    #[test]
    fn header_too_short_rejected() {
        assert!(parse_pack_header(b"PACK").is_err());
    }
}
