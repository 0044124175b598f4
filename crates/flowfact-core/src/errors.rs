//! Error taxonomy for flowfact-core and its downstream analysis crates.
//!
//! This mirrors the categories from the analysis specification exactly:
//! `InvalidId`, `SchemaViolation`, `InvariantViolation`, `Resolution`,
//! `BoundsExceeded`, `BaselineCoverageMissing`, `FixpointOverflow`, `IO`.
//! Constructors are named after the category, not the call site, so error
//! handling code can match on variants without needing string matching.

use thiserror::Error;

/// The crate-wide result alias.
pub type FlowfactResult<T> = Result<T, FlowfactError>;

#[derive(Debug, Error)]
pub enum FlowfactError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("bounds exceeded: {0}")]
    BoundsExceeded(String),

    #[error("baseline coverage missing: {0}")]
    BaselineCoverageMissing(String),

    #[error("fixpoint overflow: {0}")]
    FixpointOverflow(String),

    #[error("io error: {0}")]
    Io(String),
}

impl FlowfactError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    pub fn invariant_violation(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn bounds_exceeded(msg: impl Into<String>) -> Self {
        Self::BoundsExceeded(msg.into())
    }

    pub fn baseline_coverage_missing(msg: impl Into<String>) -> Self {
        Self::BaselineCoverageMissing(msg.into())
    }

    pub fn fixpoint_overflow(msg: impl Into<String>) -> Self {
        Self::FixpointOverflow(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl From<std::io::Error> for FlowfactError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
