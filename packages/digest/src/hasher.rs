//! Streaming content hasher backed by the digest cache.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use hashvault_record::FileRecord;

use crate::cache::DigestCache;
use crate::digest::Digest;
use crate::error::DigestError;
use crate::identity::IdentityKey;

/// Size of the read buffer used while hashing.
pub const READ_BUFFER_SIZE: usize = 1 << 15;

/// How cache hits are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Always hash file content. Results still populate the cache.
    #[default]
    Disabled,
    /// Use a cached digest without reading the file.
    Trust,
    /// Hash anyway and fail if the cached digest disagrees.
    Verify,
}

/// Opens file content for hashing.
pub trait ContentSource: Send + Sync {
    /// Open `path` for sequential reading.
    ///
    /// # Errors
    ///
    /// * If the file cannot be opened
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// Reads straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl ContentSource for FsSource {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }
}

/// Computes content digests for file records.
#[derive(Debug)]
pub struct ContentHasher<S = FsSource> {
    cache: Arc<DigestCache>,
    mode: CacheMode,
    source: S,
}

impl ContentHasher<FsSource> {
    /// Hasher reading from the filesystem.
    #[must_use]
    pub const fn new(cache: Arc<DigestCache>, mode: CacheMode) -> Self {
        Self::with_source(cache, mode, FsSource)
    }
}

impl<S: ContentSource> ContentHasher<S> {
    /// Hasher reading through a custom content source.
    #[must_use]
    pub const fn with_source(cache: Arc<DigestCache>, mode: CacheMode, source: S) -> Self {
        Self {
            cache,
            mode,
            source,
        }
    }

    /// The cache this hasher reads and fills.
    #[must_use]
    pub const fn cache(&self) -> &Arc<DigestCache> {
        &self.cache
    }

    /// Hash `record` and store the uppercase hex digest in it.
    ///
    /// Freshly computed digests always go into the cache, whatever the mode.
    ///
    /// # Errors
    ///
    /// * If the file cannot be opened or read; the record keeps an empty digest
    /// * In [`CacheMode::Verify`], if the cached digest disagrees with the
    ///   computed one
    pub fn hash(&self, record: &mut FileRecord) -> Result<Digest, DigestError> {
        let key = IdentityKey::of(record);

        let cached = match self.mode {
            CacheMode::Disabled => None,
            CacheMode::Trust | CacheMode::Verify => self.cache.lookup(key),
        };

        if self.mode == CacheMode::Trust {
            if let Some(digest) = cached {
                log::trace!("Cache hit for {}", record.path.display());
                record.digest = digest.to_hex();
                return Ok(digest);
            }
        }

        let computed = self.compute(&record.path)?;

        if let Some(cached) = cached {
            if cached != computed {
                return Err(DigestError::CacheMismatch {
                    path: record.path.clone(),
                    cached,
                    computed,
                });
            }
        }

        record.digest = computed.to_hex();
        self.cache.store(key, computed);
        Ok(computed)
    }

    /// Stream the file through MD5 without touching the cache.
    ///
    /// # Errors
    ///
    /// * If the file cannot be opened or read
    pub fn compute(&self, path: &Path) -> Result<Digest, DigestError> {
        let mut reader = self.source.open(path).map_err(|e| DigestError::OpenError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut context = md5::Context::new();
        let mut buffer = vec![0_u8; READ_BUFFER_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(DigestError::ReadError {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            };
            context.consume(&buffer[..read]);
        }

        Ok(context.compute().into())
    }
}
