//! Persistent digest cache keyed by file identity.
//!
//! The on-disk format is a plain concatenation of fixed-size records: an
//! 8-byte little-endian identity key followed by the 16 raw digest bytes. There
//! is no header and no count; readers stop at end of file.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::digest::{DIGEST_LEN, Digest};
use crate::error::DigestError;
use crate::identity::IdentityKey;

/// Size in bytes of one on-disk cache record.
pub const CACHE_RECORD_LEN: usize = 8 + DIGEST_LEN;

/// Process-wide cache of previously computed digests.
///
/// Every access goes through one lock. Hashing I/O dwarfs the time spent
/// holding it, so the map is not sharded.
#[derive(Debug)]
pub struct DigestCache {
    path: PathBuf,
    entries: Mutex<HashMap<IdentityKey, Digest>>,
}

impl DigestCache {
    /// An empty cache that will persist to `path`.
    #[must_use]
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Load the cache stored at `path`.
    ///
    /// A missing file yields an empty cache. A trailing partial record is
    /// ignored with a warning.
    ///
    /// # Errors
    ///
    /// * If the file exists but cannot be read
    pub fn load(path: &Path) -> Result<Self, DigestError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No digest cache at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(DigestError::CacheLoadError {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        let chunks = bytes.chunks_exact(CACHE_RECORD_LEN);
        if !chunks.remainder().is_empty() {
            log::warn!(
                "Digest cache {} ends with {} stray bytes, ignoring them",
                path.display(),
                chunks.remainder().len()
            );
        }

        let entries: HashMap<IdentityKey, Digest> = chunks.filter_map(decode_record).collect();

        log::debug!(
            "Loaded {} cached digests from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    /// Cached digest for `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: IdentityKey) -> Option<Digest> {
        self.entries.lock().get(&key).copied()
    }

    /// Insert or overwrite the digest for `key`.
    pub fn store(&self, key: IdentityKey, digest: Digest) {
        self.entries.lock().insert(key, digest);
    }

    /// Number of cached digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Where [`persist`](Self::persist) writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache file with the full in-memory mapping.
    ///
    /// Records are written in key order so unchanged caches produce
    /// identical files. The new content goes to a sibling `.partial` file
    /// that is renamed over the cache, so a failed write leaves the previous
    /// cache intact.
    ///
    /// # Errors
    ///
    /// * If the parent directory or the file cannot be written
    pub fn persist(&self) -> Result<(), DigestError> {
        let mut snapshot: Vec<(IdentityKey, Digest)> = self
            .entries
            .lock()
            .iter()
            .map(|(key, digest)| (*key, *digest))
            .collect();
        snapshot.sort_unstable();

        self.write_records(&snapshot)
            .map_err(|e| DigestError::CachePersistError {
                path: self.path.clone(),
                source: e,
            })?;

        log::debug!(
            "Persisted {} cached digests to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_records(&self, records: &[(IdentityKey, Digest)]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = staging_path(&self.path);
        let written = write_staged(&staging, records).and_then(|()| fs::rename(&staging, &self.path));
        if written.is_err() {
            let _ = fs::remove_file(&staging);
        }
        written
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_staged(staging: &Path, records: &[(IdentityKey, Digest)]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(staging)?);
    for (key, digest) in records {
        writer.write_all(&key.to_le_bytes())?;
        writer.write_all(digest.as_bytes())?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()
}

fn decode_record(chunk: &[u8]) -> Option<(IdentityKey, Digest)> {
    let (key, digest) = chunk.split_at_checked(8)?;
    Some((
        IdentityKey::from_le_bytes(key.try_into().ok()?),
        Digest::from_bytes(digest.try_into().ok()?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = DigestCache::load(&dir.path().join("digests.bin")).unwrap();

        assert!(cache.is_empty());
        assert_eq!(cache.lookup(IdentityKey(1)), None);
    }

    #[test]
    fn test_store_and_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = DigestCache::empty(&dir.path().join("digests.bin"));
        let digest = Digest::of_bytes(b"hello");

        cache.store(IdentityKey(7), digest);
        assert_eq!(cache.lookup(IdentityKey(7)), Some(digest));

        let other = Digest::of_bytes(b"world");
        cache.store(IdentityKey(7), other);
        assert_eq!(cache.lookup(IdentityKey(7)), Some(other));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("digests.bin");
        let cache = DigestCache::empty(&path);
        cache.store(IdentityKey(1), Digest::of_bytes(b"hello"));
        cache.store(IdentityKey(u64::MAX), Digest::of_bytes(b"world"));

        cache.persist().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 2 * CACHE_RECORD_LEN as u64);
        let reloaded = DigestCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.lookup(IdentityKey(1)), Some(Digest::of_bytes(b"hello")));
        assert_eq!(
            reloaded.lookup(IdentityKey(u64::MAX)),
            Some(Digest::of_bytes(b"world"))
        );
    }

    #[test]
    fn test_record_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("digests.bin");
        let cache = DigestCache::empty(&path);
        let digest = Digest::of_bytes(b"hello");
        cache.store(IdentityKey(0x0102), digest);

        cache.persist().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..], digest.as_bytes());
    }

    #[test]
    fn test_persist_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("digests.bin");
        fs::write(&path, vec![0xAA; 5 * CACHE_RECORD_LEN]).unwrap();

        let cache = DigestCache::empty(&path);
        cache.store(IdentityKey(3), Digest::of_bytes(b"x"));
        cache.persist().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), CACHE_RECORD_LEN as u64);
    }

    #[test]
    fn test_persist_replaces_leftover_staging_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("digests.bin");
        fs::write(dir.path().join("digests.bin.partial"), [0xFF; 7]).unwrap();

        let cache = DigestCache::empty(&path);
        cache.store(IdentityKey(4), Digest::of_bytes(b"y"));
        cache.persist().unwrap();

        assert!(!dir.path().join("digests.bin.partial").exists());
        assert_eq!(DigestCache::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_persist_keeps_previous_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("digests.bin");
        let previous = DigestCache::empty(&path);
        previous.store(IdentityKey(1), Digest::of_bytes(b"hello"));
        previous.persist().unwrap();

        // a directory in the staging spot makes the write fail
        fs::create_dir_all(dir.path().join("digests.bin.partial")).unwrap();
        let next = DigestCache::empty(&path);
        next.store(IdentityKey(2), Digest::of_bytes(b"world"));

        assert!(matches!(
            next.persist(),
            Err(DigestError::CachePersistError { .. })
        ));
        let reloaded = DigestCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.lookup(IdentityKey(1)), Some(Digest::of_bytes(b"hello")));
    }

    #[test]
    fn test_trailing_partial_record_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("digests.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&IdentityKey(9).to_le_bytes());
        bytes.extend_from_slice(Digest::of_bytes(b"hello").as_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        fs::write(&path, bytes).unwrap();

        let cache = DigestCache::load(&path).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(IdentityKey(9)), Some(Digest::of_bytes(b"hello")));
    }
}
