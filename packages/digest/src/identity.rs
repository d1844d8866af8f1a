//! Identity keys indexing the digest cache.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::hash::Hasher;
use std::path::Path;

use hashvault_record::FileRecord;
use twox_hash::XxHash64;

/// A 64-bit fingerprint of (path, modified time, size).
///
/// Collisions are possible and tolerated: the key selects a cache slot, it
/// says nothing about content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(pub u64);

impl IdentityKey {
    /// Key for the given identity fields.
    #[must_use]
    pub fn new(path: &Path, modified: i64, size: u64) -> Self {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(path.as_os_str().as_encoded_bytes());
        // Separates the path from the numeric fields.
        hasher.write_u8(0xff);
        hasher.write_i64(modified);
        hasher.write_u64(size);
        Self(hasher.finish())
    }

    /// Key for a discovered file.
    #[must_use]
    pub fn of(record: &FileRecord) -> Self {
        Self::new(&record.path, record.modified, record.size)
    }

    /// Fixed little-endian encoding used in the cache file.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decode the cache file encoding.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}
