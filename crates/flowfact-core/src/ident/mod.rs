//! Canonical, parseable identifiers for functions, statements, callsites,
//! variables, and heap buckets.
//!
//! Every identifier kind round-trips through a single canonical string form:
//! `parse(stringify(x)) == x`, and any string that parses successfully must
//! already have been in canonical form — non-canonical encodings (lowercase
//! percent-hex, leading zeros, alternate path separators) are rejected rather
//! than normalized. Comparators decompose identifiers into their logical
//! parts and compare those parts lexicographically, never the raw string.

mod percent;

use std::cmp::Ordering;
use std::fmt;

use crate::errors::{FlowfactError, FlowfactResult};

/// A non-negative half-open byte span `[start, end)` within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn new(start: u64, end: u64) -> FlowfactResult<Self> {
        if end < start {
            return Err(FlowfactError::invalid_id(format!(
                "span end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

fn validate_repo_path(path: &str) -> FlowfactResult<()> {
    if path.is_empty() {
        return Err(FlowfactError::invalid_id("file path must not be empty"));
    }
    if path.starts_with('/') {
        return Err(FlowfactError::invalid_id(format!(
            "file path must be repo-relative, got absolute path: {path}"
        )));
    }
    if path.contains('\\') {
        return Err(FlowfactError::invalid_id(format!(
            "file path must use '/' separators: {path}"
        )));
    }
    for seg in path.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." {
            return Err(FlowfactError::invalid_id(format!(
                "file path contains an illegal segment '{seg}': {path}"
            )));
        }
    }
    Ok(())
}

fn parse_non_negative_int(s: &str, what: &str) -> FlowfactResult<u64> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) || s.starts_with('+') || s.starts_with('-')
    {
        return Err(FlowfactError::invalid_id(format!(
            "{what} is not a canonical non-negative integer: {s}"
        )));
    }
    s.parse::<u64>()
        .map_err(|_| FlowfactError::invalid_id(format!("{what} is not a valid integer: {s}")))
}

/// `(filePath, startOffset, endOffset)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncId {
    pub file_path: String,
    pub span: Span,
}

impl FuncId {
    pub fn new(file_path: impl Into<String>, span: Span) -> FlowfactResult<Self> {
        let file_path = file_path.into();
        validate_repo_path(&file_path)?;
        Ok(Self { file_path, span })
    }

    pub fn to_canonical_string(&self) -> String {
        format!(
            "f:{}:{}:{}",
            percent::encode(&self.file_path),
            self.span.start,
            self.span.end
        )
    }

    pub fn parse(s: &str) -> FlowfactResult<Self> {
        let rest = s
            .strip_prefix("f:")
            .ok_or_else(|| FlowfactError::invalid_id(format!("not a FuncId: {s}")))?;
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 3 {
            return Err(FlowfactError::invalid_id(format!("malformed FuncId: {s}")));
        }
        if !percent::is_canonical(parts[0]) {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical path encoding in FuncId: {s}"
            )));
        }
        let file_path = percent::decode(parts[0])
            .ok_or_else(|| FlowfactError::invalid_id(format!("bad percent-encoding: {s}")))?;
        let start = parse_non_negative_int(parts[1], "FuncId.start")?;
        let end = parse_non_negative_int(parts[2], "FuncId.end")?;
        let id = FuncId::new(file_path, Span::new(start, end)?)?;
        if id.to_canonical_string() != s {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical FuncId: {s}"
            )));
        }
        Ok(id)
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl PartialOrd for FuncId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FuncId {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.file_path, self.span.start, self.span.end).cmp(&(
            &other.file_path,
            other.span.start,
            other.span.end,
        ))
    }
}

/// `(FuncId, statementIndex)`. `CallsiteId` is a type alias: by construction
/// a callsite's id has the same shape as a statement id (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StmtId {
    pub func_id: FuncId,
    pub stmt_index: u64,
}

pub type CallsiteId = StmtId;

impl StmtId {
    pub fn new(func_id: FuncId, stmt_index: u64) -> Self {
        Self { func_id, stmt_index }
    }

    pub fn to_canonical_string(&self) -> String {
        format!(
            "s:{}:{}:{}:{}",
            percent::encode(&self.func_id.file_path),
            self.func_id.span.start,
            self.func_id.span.end,
            self.stmt_index
        )
    }

    pub fn parse(s: &str) -> FlowfactResult<Self> {
        let rest = s
            .strip_prefix("s:")
            .ok_or_else(|| FlowfactError::invalid_id(format!("not a StmtId: {s}")))?;
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 4 {
            return Err(FlowfactError::invalid_id(format!("malformed StmtId: {s}")));
        }
        if !percent::is_canonical(parts[0]) {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical path encoding in StmtId: {s}"
            )));
        }
        let file_path = percent::decode(parts[0])
            .ok_or_else(|| FlowfactError::invalid_id(format!("bad percent-encoding: {s}")))?;
        let start = parse_non_negative_int(parts[1], "StmtId.start")?;
        let end = parse_non_negative_int(parts[2], "StmtId.end")?;
        let stmt_index = parse_non_negative_int(parts[3], "StmtId.stmtIndex")?;
        let func_id = FuncId::new(file_path, Span::new(start, end)?)?;
        let id = StmtId::new(func_id, stmt_index);
        if id.to_canonical_string() != s {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical StmtId: {s}"
            )));
        }
        Ok(id)
    }

    /// Whether this statement's anchor lies within the given function span.
    pub fn belongs_to(&self, func_id: &FuncId) -> bool {
        &self.func_id == func_id
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl PartialOrd for StmtId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StmtId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.func_id
            .cmp(&other.func_id)
            .then(self.stmt_index.cmp(&other.stmt_index))
    }
}

/// A variable identifier: `p{i}` for the i-th parameter, `v{i}` for the i-th
/// local/temporary. All `p*` sort before all `v*`, then by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarId {
    Param(u64),
    Local(u64),
}

impl VarId {
    pub fn index(&self) -> u64 {
        match self {
            VarId::Param(i) | VarId::Local(i) => *i,
        }
    }

    pub fn to_canonical_string(&self) -> String {
        match self {
            VarId::Param(i) => format!("p{i}"),
            VarId::Local(i) => format!("v{i}"),
        }
    }

    pub fn parse(s: &str) -> FlowfactResult<Self> {
        if let Some(rest) = s.strip_prefix('p') {
            let i = parse_non_negative_int(rest, "VarId param index")?;
            return Ok(VarId::Param(i));
        }
        if let Some(rest) = s.strip_prefix('v') {
            let i = parse_non_negative_int(rest, "VarId local index")?;
            return Ok(VarId::Local(i));
        }
        Err(FlowfactError::invalid_id(format!("not a VarId: {s}")))
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl PartialOrd for VarId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VarId {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |v: &VarId| matches!(v, VarId::Local(_)) as u8;
        rank(self)
            .cmp(&rank(other))
            .then(self.index().cmp(&other.index()))
    }
}

/// `(allocationSiteStmtId, propertyName)`. `propertyName` is either a
/// concrete name or the literal `"*"` for a dynamic key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeapId {
    pub anchor: StmtId,
    pub property: String,
}

pub const DYNAMIC_PROPERTY: &str = "*";

impl HeapId {
    pub fn new(anchor: StmtId, property: impl Into<String>) -> Self {
        Self {
            anchor,
            property: property.into(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.property == DYNAMIC_PROPERTY
    }

    pub fn to_canonical_string(&self) -> String {
        format!(
            "h:{}:{}:{}:{}:{}",
            percent::encode(&self.anchor.func_id.file_path),
            self.anchor.func_id.span.start,
            self.anchor.func_id.span.end,
            self.anchor.stmt_index,
            percent::encode(&self.property)
        )
    }

    pub fn parse(s: &str) -> FlowfactResult<Self> {
        let rest = s
            .strip_prefix("h:")
            .ok_or_else(|| FlowfactError::invalid_id(format!("not a HeapId: {s}")))?;
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 5 {
            return Err(FlowfactError::invalid_id(format!("malformed HeapId: {s}")));
        }
        if !percent::is_canonical(parts[0]) || !percent::is_canonical(parts[4]) {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical percent-encoding in HeapId: {s}"
            )));
        }
        let file_path = percent::decode(parts[0])
            .ok_or_else(|| FlowfactError::invalid_id(format!("bad percent-encoding: {s}")))?;
        let start = parse_non_negative_int(parts[1], "HeapId.start")?;
        let end = parse_non_negative_int(parts[2], "HeapId.end")?;
        let stmt_index = parse_non_negative_int(parts[3], "HeapId.stmtIndex")?;
        let property = percent::decode(parts[4])
            .ok_or_else(|| FlowfactError::invalid_id(format!("bad percent-encoding: {s}")))?;
        let func_id = FuncId::new(file_path, Span::new(start, end)?)?;
        let id = HeapId::new(StmtId::new(func_id, stmt_index), property);
        if id.to_canonical_string() != s {
            return Err(FlowfactError::invalid_id(format!(
                "non-canonical HeapId: {s}"
            )));
        }
        Ok(id)
    }
}

impl fmt::Display for HeapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl PartialOrd for HeapId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.anchor
            .cmp(&other.anchor)
            .then(self.property.cmp(&other.property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert_eq;

    fn fid(path: &str, s: u64, e: u64) -> FuncId {
        FuncId::new(path, Span::new(s, e).unwrap()).unwrap()
    }

    #[test]
    fn func_id_round_trip() {
        let id = fid("src/a.ts", 0, 10);
        let s = id.to_canonical_string();
        assert_eq!(s, "f:src%2Fa.ts:0:10");
        assert_eq!(FuncId::parse(&s).unwrap(), id);
    }

    #[test]
    fn func_id_rejects_absolute_path() {
        assert!(FuncId::new("/src/a.ts", Span::new(0, 1).unwrap()).is_err());
    }

    #[test]
    fn func_id_rejects_dotdot_segment() {
        assert!(FuncId::new("src/../a.ts", Span::new(0, 1).unwrap()).is_err());
    }

    #[test]
    fn func_id_rejects_leading_zero_offsets() {
        assert!(FuncId::parse("f:src%2Fa.ts:00:10").is_err());
    }

    #[test]
    fn stmt_id_round_trip_and_ordering() {
        let f = fid("src/a.ts", 0, 10);
        let s0 = StmtId::new(f.clone(), 0);
        let s1 = StmtId::new(f, 1);
        assert!(s0 < s1);
        assert_eq!(StmtId::parse(&s1.to_canonical_string()).unwrap(), s1);
    }

    #[test]
    fn var_id_ordering_params_before_locals() {
        let p1 = VarId::Param(1);
        let v0 = VarId::Local(0);
        assert!(p1 < v0);
        assert_eq!(VarId::parse("p1").unwrap(), p1);
        assert_eq!(VarId::parse("v0").unwrap(), v0);
    }

    #[test]
    fn heap_id_round_trip_dynamic_property() {
        let f = fid("src/a.ts", 0, 10);
        let anchor = StmtId::new(f, 0);
        let h = HeapId::new(anchor, DYNAMIC_PROPERTY);
        let s = h.to_canonical_string();
        assert!(s.ends_with(":*"));
        assert_eq!(HeapId::parse(&s).unwrap(), h);
    }

    #[test]
    fn func_id_ordering_by_parts() {
        let a = fid("a.ts", 5, 10);
        let b = fid("b.ts", 0, 1);
        assert!(a < b);
    }

    proptest::proptest! {
        /// `parse(stringify(x)) == x` for every identifier kind, over
        /// generated repo-relative paths, offsets, and property names
        /// (spec §8's "canonical ordering"/determinism properties).
        #[test]
        fn func_id_round_trips_through_canonical_string(
            seg1 in "[a-zA-Z][a-zA-Z0-9_]{0,6}",
            seg2 in "[a-zA-Z][a-zA-Z0-9_]{0,6}",
            start in 0u64..1_000_000,
            len in 0u64..1_000_000,
        ) {
            let path = format!("{seg1}/{seg2}.ts");
            let id = FuncId::new(path, Span::new(start, start + len).unwrap()).unwrap();
            let s = id.to_canonical_string();
            prop_assert_eq!(FuncId::parse(&s).unwrap(), id);
        }

        #[test]
        fn stmt_id_round_trips_through_canonical_string(
            seg in "[a-zA-Z][a-zA-Z0-9_]{0,6}",
            start in 0u64..1_000_000,
            len in 0u64..1_000_000,
            stmt_index in 0u64..1_000_000_000,
        ) {
            let f = FuncId::new(format!("{seg}.ts"), Span::new(start, start + len).unwrap()).unwrap();
            let id = StmtId::new(f, stmt_index);
            let s = id.to_canonical_string();
            prop_assert_eq!(StmtId::parse(&s).unwrap(), id);
        }

        #[test]
        fn var_id_round_trips_through_canonical_string(index in 0u64..1_000_000_000, is_local in proptest::bool::ANY) {
            let v = if is_local { VarId::Local(index) } else { VarId::Param(index) };
            let s = v.to_canonical_string();
            prop_assert_eq!(VarId::parse(&s).unwrap(), v);
        }

        #[test]
        fn heap_id_round_trips_through_canonical_string(
            seg in "[a-zA-Z][a-zA-Z0-9_]{0,6}",
            start in 0u64..1_000_000,
            len in 0u64..1_000_000,
            stmt_index in 0u64..1_000_000_000,
            property in "[a-zA-Z_$][a-zA-Z0-9_$]{0,10}",
        ) {
            let f = FuncId::new(format!("{seg}.ts"), Span::new(start, start + len).unwrap()).unwrap();
            let anchor = StmtId::new(f, stmt_index);
            let h = HeapId::new(anchor, property);
            let s = h.to_canonical_string();
            prop_assert_eq!(HeapId::parse(&s).unwrap(), h);
        }
    }
}
