//! Fixed-size content digests.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;

/// Length in bytes of a content digest.
pub const DIGEST_LEN: usize = 16;

/// A 16-byte MD5 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Digest of an in-memory buffer.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Uppercase hex, two digits per byte.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Parse a 32-digit hex string in either case.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0_u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl From<md5::Digest> for Digest {
    fn from(digest: md5::Digest) -> Self {
        Self(digest.0)
    }
}
