//! Deterministic SHA-256 hashing of canonical JSON, used for content
//! addressing (spec §4.7) and the permutation-invariance property (spec §8).

use sha2::{Digest, Sha256};

use crate::determinism::canonical_json::canonical_json_bytes;
use crate::errors::FlowfactResult;

/// Hash raw bytes, returning lowercase hex.
pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Hash a JSON value's canonical byte form, returning lowercase hex.
pub fn hash_canonical_json_hex(value: &serde_json::Value) -> FlowfactResult<String> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes_hex(&bytes))
}

/// Hash a content-addressed cache key: `(configVersion, normalizedIr)`.
pub fn hash_cache_key(config_version: u32, normalized_ir: &serde_json::Value) -> FlowfactResult<String> {
    let wrapper = serde_json::json!({
        "configVersion": config_version,
        "ir": normalized_ir,
    });
    hash_canonical_json_hex(&wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_is_stable() {
        let h1 = hash_bytes_hex(b"abc");
        let h2 = hash_bytes_hex(b"abc");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn hash_permutation_invariant() {
        let v1 = json!({"a": 1, "b": 2});
        let v2 = json!({"b": 2, "a": 1});
        assert_eq!(
            hash_canonical_json_hex(&v1).unwrap(),
            hash_canonical_json_hex(&v2).unwrap()
        );
    }

    #[test]
    fn cache_key_changes_with_config_version() {
        let ir = json!({"x": 1});
        let k1 = hash_cache_key(1, &ir).unwrap();
        let k2 = hash_cache_key(2, &ir).unwrap();
        assert_ne!(k1, k2);
    }
}
