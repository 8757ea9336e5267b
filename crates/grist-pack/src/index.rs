//! Pack index (v2) reading.
//!
//! The index is the pack's sorted companion: it maps ids to byte offsets
//! so a reader can seek straight to an entry. Format:
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 × 4-byte big-endian cumulative counts
//! Names:   N × 20-byte ids, ascending
//! CRC32:   N × 4-byte entry checksums
//! Offsets: N × 4-byte offsets (high bit set → large-offset table)
//! Large:   one 8-byte offset per flagged entry, in order
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! Besides the id → offset map, parsing derives each entry's byte length
//! in the pack by sorting entries by offset and differencing neighbours;
//! the entry with the largest offset has no length (it runs to the pack
//! trailer).

use std::path::Path;

use grist_hash::{FanoutTable, ObjectId};
use memmap2::Mmap;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

const HEADER_LEN: usize = 8;
const FANOUT_LEN: usize = 256 * 4;
const TRAILER_LEN: usize = 2 * grist_hash::DIGEST_LEN;

/// A fully parsed pack index.
#[derive(Debug)]
pub struct PackIndex {
    fanout: FanoutTable,
    /// Ids in ascending order.
    names: Vec<ObjectId>,
    /// Resolved pack offsets, parallel to `names`.
    offsets: Vec<u64>,
    /// Entry CRC32s, parallel to `names`. Kept for verification only.
    crcs: Vec<u32>,
    /// Entry byte lengths, parallel to `names`; `None` marks the entry
    /// with the largest offset.
    lengths: Vec<Option<u64>>,
    /// Positions sorted by pack offset.
    by_offset: Vec<(u64, u32)>,
    pack_checksum: ObjectId,
    index_checksum: ObjectId,
}

fn invalid(reason: impl Into<String>) -> PackError {
    PackError::InvalidIndex(reason.into())
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn be_u64(data: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[at..at + 8]);
    u64::from_be_bytes(bytes)
}

impl PackIndex {
    /// Open and parse an index file.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let file = std::fs::File::open(idx_path.as_ref())?;
        let data = unsafe { Mmap::map(&file)? };
        Self::parse(&data)
    }

    /// Parse an index from bytes.
    pub fn parse(data: &[u8]) -> Result<Self, PackError> {
        if data.len() < HEADER_LEN + FANOUT_LEN + TRAILER_LEN {
            return Err(invalid("file too small"));
        }
        if data[0..4] != IDX_SIGNATURE {
            return Err(invalid("bad signature"));
        }
        let version = be_u32(data, 4);
        if version != IDX_VERSION {
            return Err(invalid(format!(
                "unsupported version {version}, expected {IDX_VERSION}"
            )));
        }

        let fanout = FanoutTable::from_bytes(&data[HEADER_LEN..HEADER_LEN + FANOUT_LEN])
            .map_err(|e| invalid(format!("bad fanout: {e}")))?;
        let n = fanout.total() as usize;

        let names_at = HEADER_LEN + FANOUT_LEN;
        let crcs_at = names_at + n * grist_hash::DIGEST_LEN;
        let offsets_at = crcs_at + n * 4;
        let large_at = offsets_at + n * 4;

        if data.len() < large_at + TRAILER_LEN {
            return Err(invalid("file too small for object count"));
        }

        // Names, ascending and consistent with the fanout buckets.
        let mut names = Vec::with_capacity(n);
        let mut bucket_counts = [0u32; 256];
        for i in 0..n {
            let at = names_at + i * grist_hash::DIGEST_LEN;
            let oid = ObjectId::from_bytes(&data[at..at + grist_hash::DIGEST_LEN])?;
            if let Some(prev) = names.last() {
                if *prev >= oid {
                    return Err(invalid(format!("names not ascending at position {i}")));
                }
            }
            bucket_counts[oid.first_byte() as usize] += 1;
            names.push(oid);
        }
        let mut cumulative = 0u32;
        for (bucket, &count) in bucket_counts.iter().enumerate() {
            cumulative += count;
            if fanout.get(bucket as u8) != cumulative {
                return Err(invalid(format!("fanout disagrees with names at bucket {bucket}")));
            }
        }

        let crcs: Vec<u32> = (0..n).map(|i| be_u32(data, crcs_at + i * 4)).collect();

        // 32-bit offsets; a set high bit defers to the large-offset table,
        // consumed in order of appearance.
        let raw_offsets: Vec<u32> = (0..n).map(|i| be_u32(data, offsets_at + i * 4)).collect();
        let large_count = raw_offsets.iter().filter(|&&v| v & 0x8000_0000 != 0).count();

        let expected_len = large_at + large_count * 8 + TRAILER_LEN;
        if data.len() != expected_len {
            return Err(invalid(format!(
                "length {} does not match layout ({expected_len})",
                data.len()
            )));
        }

        let mut offsets = Vec::with_capacity(n);
        let mut next_large = 0usize;
        for &raw in &raw_offsets {
            if raw & 0x8000_0000 != 0 {
                offsets.push(be_u64(data, large_at + next_large * 8));
                next_large += 1;
            } else {
                offsets.push(u64::from(raw));
            }
        }

        let trailer_at = large_at + large_count * 8;
        let pack_checksum =
            ObjectId::from_bytes(&data[trailer_at..trailer_at + grist_hash::DIGEST_LEN])?;
        let index_checksum = ObjectId::from_bytes(
            &data[trailer_at + grist_hash::DIGEST_LEN..trailer_at + TRAILER_LEN],
        )?;

        // Lengths: offset-sorted neighbours differ by the entry's size;
        // the last entry runs to the pack trailer and gets None.
        let mut by_offset: Vec<(u64, u32)> = offsets
            .iter()
            .enumerate()
            .map(|(i, &off)| (off, i as u32))
            .collect();
        by_offset.sort_by_key(|&(off, _)| off);

        let mut lengths = vec![None; n];
        for pair in by_offset.windows(2) {
            let (offset, position) = pair[0];
            let (next_offset, _) = pair[1];
            lengths[position as usize] = Some(next_offset - offset);
        }

        Ok(Self {
            fanout,
            names,
            offsets,
            crcs,
            lengths,
            by_offset,
            pack_checksum,
            index_checksum,
        })
    }

    /// Look up an id, returning its pack offset.
    pub fn lookup(&self, oid: &ObjectId) -> Option<u64> {
        self.position(oid).map(|i| self.offsets[i])
    }

    /// Look up an id, returning its pack offset and byte length.
    ///
    /// The length is `None` for the entry with the largest offset, whose
    /// bytes run to the start of the pack trailer.
    pub fn entry_span(&self, oid: &ObjectId) -> Option<(u64, Option<u64>)> {
        self.position(oid).map(|i| (self.offsets[i], self.lengths[i]))
    }

    /// The id of the entry starting at the given pack offset.
    pub fn oid_at_offset(&self, offset: u64) -> Option<&ObjectId> {
        self.by_offset
            .binary_search_by_key(&offset, |&(off, _)| off)
            .ok()
            .map(|pos| &self.names[self.by_offset[pos].1 as usize])
    }

    fn position(&self, oid: &ObjectId) -> Option<usize> {
        let range = self.fanout.range(oid.first_byte());
        let names = &self.names[range.clone()];
        names
            .binary_search(oid)
            .ok()
            .map(|within| range.start + within)
    }

    pub fn num_objects(&self) -> u32 {
        self.names.len() as u32
    }

    /// Id at the given sorted position.
    pub fn oid_at(&self, position: u32) -> &ObjectId {
        &self.names[position as usize]
    }

    /// Pack offset at the given sorted position.
    pub fn offset_at(&self, position: u32) -> u64 {
        self.offsets[position as usize]
    }

    pub(crate) fn crc32_at(&self, position: u32) -> u32 {
        self.crcs[position as usize]
    }

    pub(crate) fn length_at(&self, position: u32) -> Option<u64> {
        self.lengths[position as usize]
    }

    /// Iterate `(id, offset)` pairs in ascending id order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&ObjectId, u64)> {
        self.names.iter().zip(self.offsets.iter().copied())
    }

    /// Pack checksum recorded in the trailer.
    pub fn pack_checksum(&self) -> &ObjectId {
        &self.pack_checksum
    }

    /// Checksum of the index file itself.
    pub fn index_checksum(&self) -> &ObjectId {
        &self.index_checksum
    }
}
