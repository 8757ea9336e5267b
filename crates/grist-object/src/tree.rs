use bstr::{BStr, BString, ByteSlice};
use grist_hash::ObjectId;

use crate::ObjectError;

/// Permission of a tree entry.
///
/// Exactly four values exist in the format; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
    /// Subdirectory (40000, no leading zero)
    Dir,
}

impl FileMode {
    /// Parse from the ASCII form used in tree entries.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"100644" => Ok(Self::Regular),
            b"100755" => Ok(Self::Executable),
            b"120000" => Ok(Self::Symlink),
            b"40000" => Ok(Self::Dir),
            other => Err(ObjectError::InvalidFileMode(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// The canonical ASCII form.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Regular => b"100644",
            Self::Executable => b"100755",
            Self::Symlink => b"120000",
            Self::Dir => b"40000",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir)
    }
}

/// A single entry in a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: ObjectId,
}

/// A tree object: a directory listing.
///
/// The format requires entries sorted by file name, but this codec trusts
/// the stored order: parsing preserves it and serialization never re-sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tree content from its binary form.
    ///
    /// Each entry is `<perm-ascii> <name>\0<20-byte-oid>`.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let space_pos = content[pos..]
                .find_byte(b' ')
                .map(|p| p + pos)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after perm".into(),
                })?;

            let mode =
                FileMode::from_bytes(&content[pos..space_pos]).map_err(|_| {
                    ObjectError::InvalidTreeEntry {
                        offset: pos,
                        reason: "unknown perm".into(),
                    }
                })?;

            let name_start = space_pos + 1;
            let null_pos = content[name_start..]
                .find_byte(0)
                .map(|p| p + name_start)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "missing null after name".into(),
                })?;

            let name = BString::from(&content[name_start..null_pos]);

            let oid_start = null_pos + 1;
            let oid_end = oid_start + grist_hash::DIGEST_LEN;
            if oid_end > content.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: oid_start,
                    reason: "truncated id".into(),
                });
            }
            let oid = ObjectId::from_bytes(&content[oid_start..oid_end])?;

            entries.push(TreeEntry { mode, name, oid });
            pos = oid_end;
        }

        Ok(Self { entries })
    }

    /// Serialize tree content, emitting entries in stored order.
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    /// Lookup an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
