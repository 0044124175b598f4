//! Sharded, content-addressed function-summary cache (spec §4.7).
//!
//! Layout: `<cacheRoot>/func_summaries/<hex[0:2]>/<hex[2:4]>/<hex>.json`.
//! Entries are immutable once written: the cache key is the SHA-256 digest
//! of the canonicalized `(configVersion, normalizedIr)` pair
//! (`flowfact_core::determinism::hashing::hash_cache_key`), so two writers
//! racing to populate the same key are writing the same bytes. Writes go
//! through a temp file in the same shard directory followed by `rename`,
//! so a reader never observes a partially written entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::{CacheError, CacheResult};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn validate_key(key: &str) -> CacheResult<()> {
    let ok = key.len() == 64 && key.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase());
    if ok {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// A content-addressed store for one cache "namespace" (e.g. `func_summaries`).
///
/// `root` is the cache root passed on the CLI; `namespace` subdivides it so
/// future cache kinds (e.g. a call-graph resolution cache) can share a root
/// without colliding.
pub struct ContentStore {
    namespace_root: PathBuf,
    /// Serializes directory creation; filesystem rename is already atomic,
    /// this just avoids redundant `create_dir_all` races under load.
    mkdir_lock: Mutex<()>,
}

impl ContentStore {
    pub fn new(cache_root: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            namespace_root: cache_root.into().join(namespace),
            mkdir_lock: Mutex::new(()),
        }
    }

    fn shard_dir(&self, key: &str) -> PathBuf {
        self.namespace_root.join(&key[0..2]).join(&key[2..4])
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.shard_dir(key).join(format!("{key}.json"))
    }

    /// Read a cached entry. A missing entry is `Ok(None)`, not an error.
    pub fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        validate_key(key)?;
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };
        let value = serde_json::from_slice(&bytes).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    /// Write an entry's already-canonical bytes. Per spec §4.7, if the target
    /// already exists this is a no-op (summaries are immutable, so
    /// re-deriving and rewriting the same key is wasted I/O, and a warm-cache
    /// re-run must not touch `*.json` mtimes). Otherwise writes to a sibling
    /// temp file and renames into place.
    ///
    /// Takes pre-serialized bytes rather than a `Value` and re-serializing
    /// here: the caller (`FuncSummaryCache::put`) is what owns routing
    /// through `flowfact_core::determinism::canonical_json::canonical_json_bytes`,
    /// and a second, independent `serde_json::to_vec` at this layer would
    /// just be another place that guarantee could silently stop holding.
    pub fn put_bytes(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        validate_key(key)?;
        let final_path = self.entry_path(key);
        if final_path.exists() {
            return Ok(());
        }
        let dir = self.shard_dir(key);
        {
            let _guard = self.mkdir_lock.lock();
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = dir.join(format!("{key}.json.tmp-{}-{n}", std::process::id()));

        fs::write(&tmp_path, bytes).map_err(|e| io_err(&tmp_path, e))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| io_err(&final_path, e))?;
        Ok(())
    }

    pub fn contains(&self, key: &str) -> CacheResult<bool> {
        validate_key(key)?;
        Ok(self.entry_path(key).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> String {
        "a".repeat(64)
    }

    #[test]
    fn missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), "func_summaries");
        assert!(store.get(&key()).unwrap().is_none());
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), "func_summaries");
        let v = json!({"edges": []});
        store.put_bytes(&key(), serde_json::to_vec(&v).unwrap().as_slice()).unwrap();
        assert_eq!(store.get(&key()).unwrap(), Some(v));
    }

    #[test]
    fn shard_layout_matches_spec() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), "func_summaries");
        let k = key();
        store.put_bytes(&k, b"{}").unwrap();
        let expected = dir
            .path()
            .join("func_summaries")
            .join(&k[0..2])
            .join(&k[2..4])
            .join(format!("{k}.json"));
        assert!(expected.exists());
    }

    #[test]
    fn rejects_malformed_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), "func_summaries");
        assert!(store.get("not-hex").is_err());
    }

    #[test]
    fn contains_reflects_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path(), "func_summaries");
        let k = key();
        assert!(!store.contains(&k).unwrap());
        store.put_bytes(&k, b"{}").unwrap();
        assert!(store.contains(&k).unwrap());
    }
}
