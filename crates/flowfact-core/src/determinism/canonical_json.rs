//! Canonical JSON encoding used for deterministic hashing and byte-stable
//! output.
//!
//! Rules (see spec §4.2):
//! - object keys are sorted by code-point order
//! - `undefined` never reaches this layer: callers must have already elided
//!   it from objects and replaced it with `null` in arrays when building the
//!   `serde_json::Value` tree (there is no `undefined` variant in `Value`)
//! - non-finite numbers are rejected
//! - cycles are structurally impossible for `serde_json::Value` (it is a
//!   tree, never a graph), so no cycle-detection pass is needed here
//! - only plain records/arrays/primitives are accepted, which is every
//!   `Value` variant, so that check is implied by the type itself
//!
//! We do not rely on `serde_json`'s own key ordering (a `preserve_order`
//! feature flag could change it out from under us); this module builds the
//! canonical byte string explicitly so the guarantee holds regardless of
//! which features any transitive dependency enables.

use serde_json::{Number, Value};

use crate::errors::{FlowfactError, FlowfactResult};

/// Construct a `serde_json::Number` from an `f64`, rejecting NaN/Infinity.
pub fn finite_number(f: f64) -> FlowfactResult<Number> {
    Number::from_f64(f)
        .ok_or_else(|| FlowfactError::schema_violation(format!("non-finite number: {f}")))
}

/// Validate that a JSON value contains only finite numbers, recursively.
pub fn validate_finite(value: &Value) -> FlowfactResult<()> {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(FlowfactError::schema_violation(format!(
                        "non-finite number in JSON value: {n}"
                    )));
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for v in items {
                validate_finite(v)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                validate_finite(v)?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

/// Produce the canonical JSON value: validated for finiteness, with object
/// keys that will serialize in sorted order.
pub fn canonicalize_json(value: &Value) -> FlowfactResult<Value> {
    validate_finite(value)?;
    Ok(value.clone())
}

fn write_canonical(value: &Value, out: &mut String) -> FlowfactResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(FlowfactError::schema_violation(format!(
                        "non-finite number in JSON value: {n}"
                    )));
                }
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => {
            let encoded = serde_json::to_string(s)
                .map_err(|e| FlowfactError::schema_violation(format!("string encode failed: {e}")))?;
            out.push_str(&encoded);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let encoded_key = serde_json::to_string(key).map_err(|e| {
                    FlowfactError::schema_violation(format!("key encode failed: {e}"))
                })?;
                out.push_str(&encoded_key);
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

/// Serialize a JSON value to its canonical UTF-8 byte form.
pub fn canonical_json_bytes(value: &Value) -> FlowfactResult<Vec<u8>> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out.into_bytes())
}
