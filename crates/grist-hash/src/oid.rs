use std::fmt;
use std::str::FromStr;

use crate::hex::{hex_decode, hex_to_string};
use crate::{HashError, DIGEST_LEN};

/// An object identifier: the SHA-1 of an object's serialized form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; DIGEST_LEN]);

impl ObjectId {
    /// The null id (all zeros).
    pub const NULL: Self = Self([0u8; DIGEST_LEN]);

    /// Create from exactly 20 raw digest bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != DIGEST_LEN {
            return Err(HashError::InvalidDigestLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut raw = [0u8; DIGEST_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Create from a 40-character hex string (either case).
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        if hex.len() != DIGEST_LEN * 2 {
            return Err(HashError::InvalidHexLength {
                expected: DIGEST_LEN * 2,
                actual: hex.len(),
            });
        }
        let mut raw = [0u8; DIGEST_LEN];
        hex_decode(hex, &mut raw)?;
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex_to_string(&self.0)
    }

    /// First byte of the digest, used for fan-out bucketing.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

macro_rules! nominal_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(ObjectId);

        impl $name {
            pub fn new(oid: ObjectId) -> Self {
                Self(oid)
            }

            pub fn from_hex(hex: &str) -> Result<Self, HashError> {
                ObjectId::from_hex(hex).map(Self)
            }

            pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
                ObjectId::from_bytes(bytes).map(Self)
            }

            /// The underlying untyped id.
            pub fn as_oid(&self) -> &ObjectId {
                &self.0
            }

            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }

            pub fn to_hex(&self) -> String {
                self.0.to_hex()
            }
        }

        impl From<ObjectId> for $name {
            fn from(oid: ObjectId) -> Self {
                Self(oid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), &self.0.to_hex()[..8])
            }
        }

        impl FromStr for $name {
            type Err = HashError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }
    };
}

nominal_id! {
    /// The id of a tree object. Not interchangeable with [`CommitId`] or a
    /// bare [`ObjectId`]; conversion is explicit via [`TreeId::new`].
    TreeId
}

nominal_id! {
    /// The id of a commit object.
    CommitId
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HEX: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn from_hex_and_back() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(oid.to_hex(), HEX);
        assert_eq!(oid.as_bytes().len(), 20);
        assert_eq!(oid.first_byte(), 0xda);
    }

    #[test]
    fn display_parse_roundtrip() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        let parsed: ObjectId = oid.to_string().parse().unwrap();
        assert_eq!(parsed, oid);
    }

    #[test]
    fn debug_shows_short_id() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        assert_eq!(format!("{:?}", oid), "ObjectId(da39a3ee)");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        let b = ObjectId::from_hex("0000000000000000000000000000000000000002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn usable_as_map_key() {
        let oid = ObjectId::from_hex(HEX).unwrap();
        let mut map = HashMap::new();
        map.insert(oid, "value");
        assert_eq!(map.get(&oid), Some(&"value"));
    }

    #[test]
    fn null_id() {
        assert!(ObjectId::NULL.is_null());
        assert!(!ObjectId::from_hex(HEX).unwrap().is_null());
    }

    #[test]
    fn from_bytes_wrong_length() {
        assert!(matches!(
            ObjectId::from_bytes(&[0; 10]).unwrap_err(),
            HashError::InvalidDigestLength {
                expected: 20,
                actual: 10
            }
        ));
    }

    #[test]
    fn from_hex_wrong_length() {
        assert!(matches!(
            ObjectId::from_hex("abcd").unwrap_err(),
            HashError::InvalidHexLength { .. }
        ));
    }

    #[test]
    fn from_hex_invalid_char() {
        let err =
            ObjectId::from_hex("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").unwrap_err();
        assert!(matches!(err, HashError::InvalidHex { .. }));
    }

    #[test]
    fn nominal_ids_wrap_the_same_digest() {
        let tree = TreeId::from_hex(HEX).unwrap();
        let commit = CommitId::from_hex(HEX).unwrap();
        assert_eq!(tree.as_oid(), commit.as_oid());
        assert_eq!(tree.to_hex(), HEX);
        assert_eq!(format!("{:?}", commit), "CommitId(da39a3ee)");
    }
}
