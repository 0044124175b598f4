//! The determinism kernel: canonical JSON, stable sort, canonical hashing.
//!
//! Every other component that needs to produce byte-stable output goes
//! through this module rather than reaching for `serde_json::to_vec` or
//! `HashMap` iteration directly.

pub mod canonical_json;
pub mod hashing;
pub mod stable_sort;
