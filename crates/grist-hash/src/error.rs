/// Errors produced by identity and hashing operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    #[error("invalid hex length: expected {expected} chars, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hex character {character:?} at position {position}")]
    InvalidHex { position: usize, character: char },

    #[error("SHA-1 collision attack detected")]
    Sha1Collision,
}
