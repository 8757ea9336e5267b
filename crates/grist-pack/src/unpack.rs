//! Sequential pack traversal.
//!
//! [`unpack_all`] walks every entry of a pack in order, resolving deltas
//! as it goes and handing each finished object to a caller-supplied
//! sink. Off-deltas may only reference earlier entries, so an
//! offset → id map built during the walk is enough to find their bases;
//! ref-delta bases come from the caller (another pack, a loose store, or
//! objects written earlier in this same walk).

use std::collections::HashMap;

use grist_hash::ObjectId;
use grist_object::Object;

use crate::entry::{parse_entry, PackedEntry};
use crate::{delta, parse_pack_header, PackError, PACK_HEADER_SIZE};

/// Traverse all entries of a pack, in pack order.
///
/// `read_inflated` supplies the inflated envelope bytes of a known
/// object; the driver uses it for every delta base, including bases that
/// this walk itself wrote moments earlier. `write` persists a resolved
/// object and returns the id it was stored under. Returns the ids in the
/// order written.
///
/// The first malformed entry aborts the walk; objects already written
/// stay written (the sink is content-addressed, so replays are
/// idempotent).
pub fn unpack_all<R, W>(
    data: &[u8],
    mut read_inflated: R,
    mut write: W,
) -> Result<Vec<ObjectId>, PackError>
where
    R: FnMut(&ObjectId) -> Option<Vec<u8>>,
    W: FnMut(&Object) -> Result<ObjectId, PackError>,
{
    let (version, count) = parse_pack_header(data)?;

    let mut offset_to_id: HashMap<u64, ObjectId> = HashMap::new();
    let mut written = Vec::with_capacity(count as usize);
    let mut pos = PACK_HEADER_SIZE;

    for _ in 0..count {
        let entry_offset = pos as u64;
        let (entry, consumed) = parse_entry(&data[pos..], entry_offset, version)?;

        let oid = match entry {
            PackedEntry::Raw(obj) => write(&obj)?,
            PackedEntry::RefDelta { base, hunks } => {
                let base_bytes =
                    read_inflated(&base).ok_or(PackError::MissingBase(base))?;
                let obj = delta::apply(&base_bytes, &hunks)?;
                write(&obj)?
            }
            PackedEntry::OfsDelta {
                base_distance,
                hunks,
            } => {
                let target = entry_offset - base_distance;
                let base_oid = offset_to_id
                    .get(&target)
                    .copied()
                    .ok_or(PackError::UnresolvedBaseOffset { offset: target })?;
                let base_bytes = read_inflated(&base_oid)
                    .ok_or(PackError::MissingBase(base_oid))?;
                let obj = delta::apply(&base_bytes, &hunks)?;
                write(&obj)?
            }
        };

        offset_to_id.insert(entry_offset, oid);
        written.push(oid);
        pos += consumed;
    }

    Ok(written)
}
