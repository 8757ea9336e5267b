//! Random-access pack reading.
//!
//! A [`Pack`] pairs the pack bytes with a parsed [`PackIndex`] and hands
//! out entries by id. Entry byte ranges come from the index span table;
//! the entry with the largest offset runs to the start of the 20-byte
//! pack trailer. Parsed entries are memoized per id, successful parses
//! only.

use std::collections::HashMap;
use std::path::Path;

use grist_hash::ObjectId;
use grist_object::Object;
use memmap2::Mmap;

use crate::entry::{parse_entry, PackedEntry};
use crate::index::PackIndex;
use crate::{delta, parse_pack_header, PackError, MAX_DELTA_CHAIN_DEPTH};

#[derive(Debug)]
enum PackBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl PackBytes {
    fn get(&self) -> &[u8] {
        match self {
            Self::Mapped(map) => map,
            Self::Owned(vec) => vec,
        }
    }
}

/// A pack opened for random access through its index.
#[derive(Debug)]
pub struct Pack {
    data: PackBytes,
    index: PackIndex,
    version: u32,
    num_objects: u32,
    cache: HashMap<ObjectId, PackedEntry>,
}

impl Pack {
    /// Open a pack from an index and its raw bytes.
    pub fn new(index: PackIndex, data: Vec<u8>) -> Result<Self, PackError> {
        Self::from_bytes(index, PackBytes::Owned(data))
    }

    /// Open a `.pack` file and its sibling `.idx` file.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(pack_path)?;
        let data = unsafe { Mmap::map(&file)? };
        let index = PackIndex::open(idx_path)?;
        Self::from_bytes(index, PackBytes::Mapped(data))
    }

    fn from_bytes(index: PackIndex, data: PackBytes) -> Result<Self, PackError> {
        let (version, num_objects) = parse_pack_header(data.get())?;
        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }
        Ok(Self {
            data,
            index,
            version,
            num_objects,
            cache: HashMap::new(),
        })
    }

    /// Read the packed entry for an id, without resolving deltas.
    pub fn entry(&mut self, oid: &ObjectId) -> Result<PackedEntry, PackError> {
        if let Some(entry) = self.cache.get(oid) {
            return Ok(entry.clone());
        }

        let (offset, length) = self
            .index
            .entry_span(oid)
            .ok_or(PackError::NotIndexed(*oid))?;
        let slice = self.entry_slice(offset, length)?;
        let (entry, _consumed) = parse_entry(slice, offset, self.version)?;

        self.cache.insert(*oid, entry.clone());
        Ok(entry)
    }

    /// Resolve an object fully, walking delta chains within this pack.
    pub fn read_object(&mut self, oid: &ObjectId) -> Result<Object, PackError> {
        self.read_object_with(oid, |_| None)
    }

    /// Resolve an object fully, with an external source for ref-delta
    /// bases that live outside this pack.
    ///
    /// The resolver receives a base id and returns the base object's
    /// inflated envelope bytes if it can provide them. Chains are walked
    /// iteratively and bounded by [`MAX_DELTA_CHAIN_DEPTH`].
    pub fn read_object_with(
        &mut self,
        oid: &ObjectId,
        resolver: impl Fn(&ObjectId) -> Option<Vec<u8>>,
    ) -> Result<Object, PackError> {
        let start_offset = self
            .index
            .lookup(oid)
            .ok_or(PackError::NotIndexed(*oid))?;

        let mut chain: Vec<delta::DeltaHunks> = Vec::new();
        let mut current = *oid;

        for _ in 0..MAX_DELTA_CHAIN_DEPTH {
            match self.entry(&current)? {
                PackedEntry::Raw(base) => return resolve_chain(base, &chain),
                PackedEntry::OfsDelta {
                    base_distance,
                    hunks,
                } => {
                    let offset = self
                        .index
                        .lookup(&current)
                        .ok_or(PackError::NotIndexed(current))?;
                    let target = offset - base_distance;
                    let base_oid = self
                        .index
                        .oid_at_offset(target)
                        .copied()
                        .ok_or(PackError::UnresolvedBaseOffset { offset: target })?;
                    chain.push(hunks);
                    current = base_oid;
                }
                PackedEntry::RefDelta { base, hunks } => {
                    chain.push(hunks);
                    if self.index.lookup(&base).is_some() {
                        current = base;
                    } else if let Some(bytes) = resolver(&base) {
                        return resolve_chain(Object::parse(&bytes)?, &chain);
                    } else {
                        return Err(PackError::MissingBase(base));
                    }
                }
            }
        }

        Err(PackError::DeltaChainTooDeep {
            offset: start_offset,
            max_depth: MAX_DELTA_CHAIN_DEPTH,
        })
    }

    /// Whether this pack's index knows the id.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.index.lookup(oid).is_some()
    }

    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        self.data.get()
    }

    /// The byte range of the entry at `offset`, per the index span table.
    pub(crate) fn entry_slice(
        &self,
        offset: u64,
        length: Option<u64>,
    ) -> Result<&[u8], PackError> {
        let data = self.data.get();
        let start = offset as usize;
        let end = match length {
            Some(len) => start + len as usize,
            None => data.len().saturating_sub(grist_hash::DIGEST_LEN),
        };
        if start >= end || end > data.len() {
            return Err(PackError::CorruptEntry {
                offset,
                reason: format!("entry range {start}..{end} outside pack of {}", data.len()),
            });
        }
        Ok(&data[start..end])
    }
}

/// Apply a chain of delta scripts, innermost-pushed last, onto a base.
fn resolve_chain(base: Object, chain: &[delta::DeltaHunks]) -> Result<Object, PackError> {
    let mut obj = base;
    for hunks in chain.iter().rev() {
        obj = delta::apply(&obj.serialize(), hunks)?;
    }
    Ok(obj)
}
