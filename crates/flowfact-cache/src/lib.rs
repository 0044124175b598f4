//! flowfact-cache
//!
//! The content-addressed, sharded on-disk cache that lets the pipeline skip
//! re-running the cheap pass and summary normalizer for a function whose
//! normalized IR and config version haven't changed (spec §4.7).

pub mod errors;
pub mod store;

use serde_json::Value;

use flowfact_core::determinism::canonical_json::canonical_json_bytes;
use flowfact_core::determinism::hashing::hash_cache_key;

pub use crate::errors::{CacheError, CacheResult};
pub use crate::store::ContentStore;

/// The cache namespace function summaries live under.
pub const FUNC_SUMMARIES_NAMESPACE: &str = "func_summaries";

/// A typed front door onto the function-summary cache: computes the content
/// key from `(configVersion, normalizedIr)` the same way the cheap pass and
/// fixpoint stages do, so callers never construct a key by hand.
pub struct FuncSummaryCache {
    store: ContentStore,
}

impl FuncSummaryCache {
    pub fn open(cache_root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            store: ContentStore::new(cache_root, FUNC_SUMMARIES_NAMESPACE),
        }
    }

    pub fn key_for(config_version: u32, normalized_ir: &Value) -> CacheResult<String> {
        Ok(hash_cache_key(config_version, normalized_ir)?)
    }

    /// Look up a cached summary by its precomputed key.
    pub fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        self.store.get(key)
    }

    /// Store a canonicalized summary JSON value under its content key. Goes
    /// through `canonical_json_bytes` rather than handing the `Value` to the
    /// store to serialize itself, so a non-finite number is rejected here
    /// instead of silently reaching disk.
    pub fn put(&self, key: &str, summary_json: &Value) -> CacheResult<()> {
        let bytes = canonical_json_bytes(summary_json)?;
        self.store.put_bytes(key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_for_is_stable_and_config_sensitive() {
        let ir = json!({"stmts": []});
        let k1 = FuncSummaryCache::key_for(1, &ir).unwrap();
        let k2 = FuncSummaryCache::key_for(1, &ir).unwrap();
        let k3 = FuncSummaryCache::key_for(2, &ir).unwrap();
        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn open_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FuncSummaryCache::open(dir.path());
        let ir = json!({"stmts": []});
        let key = FuncSummaryCache::key_for(1, &ir).unwrap();
        let summary = json!({"edges": []});
        assert!(cache.get(&key).unwrap().is_none());
        cache.put(&key, &summary).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(summary));
    }
}
