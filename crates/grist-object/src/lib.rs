//! Loose object model: blob, tree, commit, tag parsing and serialization.
//!
//! An object's canonical byte form is its content prefixed with the typed
//! envelope header `"<kind> <size>\0"`; on disk and on the wire that
//! sequence travels zlib-deflated. The hash of the inflated sequence is
//! the object's content address.

mod blob;
mod commit;
pub mod header;
mod signature;
mod tag;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use signature::Signature;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeEntry};

use std::io::{Read, Write};

use bstr::BString;
use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use grist_hash::{hasher::Hasher, HashError, ObjectId};

/// Errors produced by object codec operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object kind: {0}")]
    InvalidKind(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("size mismatch: header declares {declared} bytes, payload has {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid tag: missing '{field}' header")]
    MissingTagField { field: &'static str },

    #[error("invalid perm: {0}")]
    InvalidFileMode(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// Parse from the kind string in envelope headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidKind(BString::from(s))),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Blob => b"blob",
            Self::Tree => b"tree",
            Self::Commit => b"commit",
            Self::Tag => b"tag",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A parsed object of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Parse the inflated envelope form (header + content).
    ///
    /// The byte count after the header must equal the declared size
    /// exactly; both truncated and trailing payloads are rejected.
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        let (kind, content_size, header_len) = header::parse_header(data)?;
        let content = &data[header_len..];
        if content.len() != content_size {
            return Err(ObjectError::SizeMismatch {
                declared: content_size,
                actual: content.len(),
            });
        }
        Self::parse_content(kind, content)
    }

    /// Parse content bytes of a known kind (no envelope header).
    pub fn parse_content(kind: ObjectType, content: &[u8]) -> Result<Self, ObjectError> {
        match kind {
            ObjectType::Blob => Ok(Self::Blob(Blob::parse(content)?)),
            ObjectType::Tree => Ok(Self::Tree(Tree::parse(content)?)),
            ObjectType::Commit => Ok(Self::Commit(Commit::parse(content)?)),
            ObjectType::Tag => Ok(Self::Tag(Tag::parse(content)?)),
        }
    }

    /// Parse the deflated form: inflate, then [`parse`](Object::parse).
    pub fn from_deflated(data: &[u8]) -> Result<Self, ObjectError> {
        let mut decoder = ZlibDecoder::new(data);
        let mut inflated = Vec::new();
        decoder
            .read_to_end(&mut inflated)
            .map_err(ObjectError::Decompress)?;
        Self::parse(&inflated)
    }

    /// Serialize to the inflated envelope form (header + content).
    pub fn serialize(&self) -> Vec<u8> {
        let content = self.serialize_content();
        let hdr = header::write_header(self.object_type(), content.len());
        let mut out = Vec::with_capacity(hdr.len() + content.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(&content);
        out
    }

    /// Serialize just the content (no envelope header).
    pub fn serialize_content(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.serialize_content().to_vec(),
            Self::Tree(t) => t.serialize_content(),
            Self::Commit(c) => c.serialize_content(),
            Self::Tag(t) => t.serialize_content(),
        }
    }

    /// Serialize to the deflated wire form.
    pub fn to_deflated(&self) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&self.serialize())
            .expect("writing to an in-memory buffer cannot fail");
        encoder
            .finish()
            .expect("deflating to an in-memory buffer cannot fail")
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
            Self::Tag(_) => ObjectType::Tag,
        }
    }

    /// Compute the content address: the hash of the inflated envelope form.
    pub fn compute_oid(&self) -> Result<ObjectId, HashError> {
        Hasher::hash_object(self.object_type().as_str(), &self.serialize_content())
    }
}
