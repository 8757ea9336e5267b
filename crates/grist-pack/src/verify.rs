//! Pack integrity checks against the trailer and the index CRC table.

use grist_hash::hasher::Hasher;
use grist_hash::ObjectId;

use crate::pack::Pack;
use crate::PackError;

impl Pack {
    /// Verify the pack trailer checksum.
    ///
    /// Hashes all pack content up to the trailing 20 bytes and compares
    /// with the stored checksum.
    pub fn verify_checksum(&self) -> Result<(), PackError> {
        let data = self.bytes();
        if data.len() < grist_hash::DIGEST_LEN {
            return Err(PackError::InvalidHeader("pack too small for checksum".into()));
        }

        let content = &data[..data.len() - grist_hash::DIGEST_LEN];
        let stored = ObjectId::from_bytes(&data[data.len() - grist_hash::DIGEST_LEN..])?;
        let computed = Hasher::digest(content)?;

        if computed != stored {
            return Err(PackError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }
        Ok(())
    }

    /// Verify every entry's bytes against the CRC32 recorded in the index.
    pub fn verify_crc32(&self) -> Result<(), PackError> {
        for position in 0..self.num_objects() {
            let oid = *self.index().oid_at(position);
            let offset = self.index().offset_at(position);
            let length = self.index().length_at(position);
            let slice = self.entry_slice(offset, length)?;

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(slice);
            let actual = hasher.finalize();

            let expected = self.index().crc32_at(position);
            if actual != expected {
                return Err(PackError::Crc32Mismatch {
                    oid,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}
