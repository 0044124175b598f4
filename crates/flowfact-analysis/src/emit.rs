//! Canonical flow-facts JSONL emitter (spec §4.10, §6).
//!
//! De-duplicates by `from→to` composite key, sorts by `(fromKind, fromFields,
//! toKind, toFields)` — `FlowFact`'s derived `Ord` already implements that
//! ordering via `FlowFactNode`'s rank table — and writes one canonical JSON
//! object per line. Empty input produces a zero-byte file, matching the
//! cache's own "never write what you don't have to" posture.

use std::collections::BTreeMap;
use std::path::Path;

use flowfact_core::determinism::canonical_json::canonical_json_bytes;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::facts::FlowFact;

/// De-duplicate (by `dedup_key`) and canonically sort a fact set.
pub fn canonicalize_facts(facts: impl IntoIterator<Item = FlowFact>) -> Vec<FlowFact> {
    let mut by_key: BTreeMap<String, FlowFact> = BTreeMap::new();
    for fact in facts {
        by_key.entry(fact.dedup_key()).or_insert(fact);
    }
    let mut out: Vec<FlowFact> = by_key.into_values().collect();
    out.sort();
    out
}

/// Write the canonical JSONL file. `facts` need not be pre-sorted or
/// pre-deduplicated; this always re-derives the canonical order.
pub fn write_flow_facts(path: &Path, facts: impl IntoIterator<Item = FlowFact>) -> FlowfactResult<()> {
    let canonical = canonicalize_facts(facts);

    if canonical.is_empty() {
        std::fs::write(path, [])?;
        return Ok(());
    }

    let mut buf = Vec::new();
    for fact in &canonical {
        let line = canonical_json_bytes(&fact.to_json())
            .map_err(|e| FlowfactError::io(format!("serializing fact for {}: {e}", path.display())))?;
        buf.extend_from_slice(&line);
        buf.push(b'\n');
    }

    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("jsonl")
    ));
    std::fs::write(&tmp_path, &buf)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
