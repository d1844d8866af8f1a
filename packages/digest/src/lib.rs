//! Content digests and the persistent digest cache.
//!
//! * [`ContentHasher`] streams a file through MD5 in 32 KiB chunks and writes
//!   the uppercase hex digest into its [`FileRecord`](hashvault_record::FileRecord)
//! * [`DigestCache`] remembers digests by [`IdentityKey`] (path, modified time,
//!   size) across runs so unchanged files are not read again
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hashvault_digest::{CacheMode, ContentHasher, DigestCache};
//!
//! let cache = Arc::new(DigestCache::load(&layout.cache_file())?);
//! let hasher = ContentHasher::new(Arc::clone(&cache), CacheMode::Trust);
//! let digest = hasher.hash(&mut record)?;
//! cache.persist()?;
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod cache;
mod digest;
mod error;
mod hasher;
mod identity;

pub use cache::{CACHE_RECORD_LEN, DigestCache};
pub use digest::{DIGEST_LEN, Digest};
pub use error::DigestError;
pub use hasher::{CacheMode, ContentHasher, ContentSource, FsSource, READ_BUFFER_SIZE};
pub use identity::IdentityKey;
