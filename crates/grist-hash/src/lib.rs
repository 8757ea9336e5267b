//! Object identity for the grist object codec.
//!
//! Provides the 20-byte [`ObjectId`] and its nominal subtypes
//! ([`TreeId`], [`CommitId`]), hex encoding/decoding, streaming SHA-1
//! with collision detection, and the fan-out table used by pack indices.

mod error;
pub mod fanout;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use fanout::FanoutTable;
pub use oid::{CommitId, ObjectId, TreeId};

/// Digest length in bytes. All identities in this codec are SHA-1.
pub const DIGEST_LEN: usize = 20;
