//! Error type for the on-disk function-summary cache.

use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry at {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache key {0:?} is not a well-formed lowercase hex sha-256 digest")]
    InvalidKey(String),

    #[error("failed to derive cache key: {0}")]
    KeyDerivation(#[from] flowfact_core::FlowfactError),
}
