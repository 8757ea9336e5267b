//! Packed-entry codec: one object slot inside a pack.
//!
//! An entry opens with a header byte carrying the kind in bits 6-4 and
//! the low four size bits; bit 7 continues the size as a little-endian
//! base-128 tail shifted left by four. Delta kinds then carry their base
//! reference (a modified base-128 distance, or a raw 20-byte id) before
//! the deflated payload.

use std::io::Read;

use flate2::bufread::ZlibDecoder;
use grist_hash::ObjectId;
use grist_object::{Object, ObjectType};

use crate::delta::{parse_hunks, DeltaHunks};
use crate::varint::{read_offset, read_size};
use crate::PackError;

/// Kind codes used in entry headers.
pub const KIND_COMMIT: u8 = 1;
pub const KIND_TREE: u8 = 2;
pub const KIND_BLOB: u8 = 3;
pub const KIND_TAG: u8 = 4;
pub const KIND_OFS_DELTA: u8 = 6;
pub const KIND_REF_DELTA: u8 = 7;

/// A parsed pack entry, before delta resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedEntry {
    /// A self-contained object embedded in the pack.
    Raw(Object),
    /// Delta whose base lies `base_distance` bytes before this entry's
    /// start in the same pack.
    OfsDelta {
        base_distance: u64,
        hunks: DeltaHunks,
    },
    /// Delta whose base is identified by id, possibly outside this pack.
    RefDelta { base: ObjectId, hunks: DeltaHunks },
}

impl PackedEntry {
    pub fn is_delta(&self) -> bool {
        !matches!(self, Self::Raw(_))
    }
}

fn corrupt(offset: u64, reason: impl Into<String>) -> PackError {
    PackError::CorruptEntry {
        offset,
        reason: reason.into(),
    }
}

/// Inflate the zlib stream at the head of `data`.
///
/// Returns the inflated bytes and the number of compressed bytes
/// consumed, so callers can keep walking the pack.
fn inflate(data: &[u8], expected: usize, offset: u64) -> Result<(Vec<u8>, usize), PackError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| corrupt(offset, format!("inflate failed: {e}")))?;
    let consumed = decoder.total_in() as usize;
    Ok((out, consumed))
}

/// Parse one pack entry from the start of `data`.
///
/// `entry_offset` is the entry's absolute offset in the pack (used for
/// error context and for validating off-delta distances); `version` is
/// the pack's header-reported version. Returns the entry and the total
/// number of bytes it occupies, header and compressed payload included.
pub fn parse_entry(
    data: &[u8],
    entry_offset: u64,
    version: u32,
) -> Result<(PackedEntry, usize), PackError> {
    let b0 = *data
        .first()
        .ok_or_else(|| corrupt(entry_offset, "empty entry"))?;
    let kind = (b0 >> 4) & 0x07;
    let low = u64::from(b0 & 0x0f);

    let mut pos = 1;
    let size = if b0 & 0x80 != 0 {
        let (tail, consumed) = read_size(&data[pos..])
            .ok_or_else(|| corrupt(entry_offset, "truncated size"))?;
        pos += consumed;
        low | (tail << 4)
    } else {
        low
    };
    let size = size as usize;

    let entry = match kind {
        KIND_COMMIT | KIND_TREE | KIND_BLOB | KIND_TAG => {
            let object_type = match kind {
                KIND_COMMIT => ObjectType::Commit,
                KIND_TREE => ObjectType::Tree,
                KIND_BLOB => ObjectType::Blob,
                _ => ObjectType::Tag,
            };
            let (payload, consumed) = inflate(&data[pos..], size, entry_offset)?;
            pos += consumed;
            if payload.len() != size {
                return Err(PackError::SizeMismatch {
                    context: "pack entry payload",
                    declared: size,
                    actual: payload.len(),
                });
            }
            PackedEntry::Raw(Object::parse_content(object_type, &payload)?)
        }
        KIND_OFS_DELTA => {
            let (base_distance, consumed) = read_offset(&data[pos..])
                .ok_or_else(|| corrupt(entry_offset, "truncated base distance"))?;
            pos += consumed;
            if base_distance == 0 {
                return Err(corrupt(entry_offset, "zero base distance"));
            }
            if base_distance > entry_offset {
                return Err(corrupt(
                    entry_offset,
                    format!("base distance {base_distance} reaches before the pack start"),
                ));
            }
            let (payload, consumed) = inflate(&data[pos..], size, entry_offset)?;
            pos += consumed;
            if payload.len() != size {
                return Err(PackError::SizeMismatch {
                    context: "delta stream",
                    declared: size,
                    actual: payload.len(),
                });
            }
            PackedEntry::OfsDelta {
                base_distance,
                hunks: parse_hunks(&payload, version)?,
            }
        }
        KIND_REF_DELTA => {
            let end = pos + grist_hash::DIGEST_LEN;
            if end > data.len() {
                return Err(corrupt(entry_offset, "truncated base id"));
            }
            let base = ObjectId::from_bytes(&data[pos..end])?;
            pos = end;
            let (payload, consumed) = inflate(&data[pos..], size, entry_offset)?;
            pos += consumed;
            if payload.len() != size {
                return Err(PackError::SizeMismatch {
                    context: "delta stream",
                    declared: size,
                    actual: payload.len(),
                });
            }
            PackedEntry::RefDelta {
                base,
                hunks: parse_hunks(&payload, version)?,
            }
        }
        reserved => {
            return Err(PackError::UnsupportedEntryKind {
                kind: reserved,
                offset: entry_offset,
            })
        }
    };

    Ok((entry, pos))
}

/// Encode an entry header byte sequence: kind plus size.
///
/// Delta base references are appended by the caller. Test pack builders
/// use this; the pack writer proper is out of scope.
pub fn encode_entry_header(kind: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut s = size;

    let mut byte = (kind << 4) | (s & 0x0f) as u8;
    s >>= 4;
    while s > 0 {
        buf.push(byte | 0x80);
        byte = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(byte);
    buf
}
