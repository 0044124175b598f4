//! Pipeline-wide configuration.
//!
//! `AnalysisConfig` is the only pipeline-wide constant (spec §9's "global
//! state: none" note — this struct is explicit, immutable-after-construction
//! configuration, not mutable global state) and it participates in every
//! cache key via `config_version`.

use crate::errors::{FlowfactError, FlowfactResult};

/// The analysis config schema version. Bump whenever any normalization,
/// lowering, or bounds rule changes in a way that could change output for
/// previously-cached functions.
pub const CONFIG_VERSION: u32 = 1;

/// Hard bounds enforced by the summary normalizer (spec §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLimits {
    pub max_edges: usize,
    pub max_fanout_per_source: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            max_edges: 25_000,
            max_fanout_per_source: 5_000,
        }
    }
}

/// The "magic integer bases" used to synthesize per-parameter and per-local
/// heap anchors (spec §4.5, §9's first open question). These values are
/// arbitrary; only the property "well-separated from any real statement
/// index" matters. We document them explicitly here rather than leaving
/// them as inline literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorBases {
    /// Base offset for synthetic per-parameter anchors: `synth(funcId, i) = param_base + i`.
    pub param_base: u64,
    /// Base offset for synthetic per-local anchors: `synth(funcId, LOCAL_BASE + i) = local_base + i`.
    pub local_base: u64,
}

impl Default for AnchorBases {
    fn default() -> Self {
        Self {
            // 10^9 and +5*10^8, per spec §9 — far beyond any real statement count.
            param_base: 1_000_000_000,
            local_base: 1_500_000_000,
        }
    }
}

/// Call-graph path resolution mode (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallGraphMode {
    Strict,
    Lenient,
}

/// A safety rail on the interprocedural worklist (spec §4.9).
pub const DEFAULT_MAX_FIXPOINT_STEPS: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub config_version: u32,
    pub limits: SummaryLimits,
    pub anchor_bases: AnchorBases,
    pub call_graph_mode: CallGraphMode,
    pub max_fixpoint_steps: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            limits: SummaryLimits::default(),
            anchor_bases: AnchorBases::default(),
            call_graph_mode: CallGraphMode::Strict,
            max_fixpoint_steps: DEFAULT_MAX_FIXPOINT_STEPS,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> FlowfactResult<()> {
        if self.limits.max_fanout_per_source > self.limits.max_edges {
            return Err(FlowfactError::invariant_violation(
                "max_fanout_per_source must not exceed max_edges",
            ));
        }
        if self.limits.max_edges == 0 {
            return Err(FlowfactError::invariant_violation(
                "max_edges must be greater than zero",
            ));
        }
        if self.anchor_bases.local_base <= self.anchor_bases.param_base {
            return Err(FlowfactError::invariant_violation(
                "local_base must be greater than param_base",
            ));
        }
        if self.max_fixpoint_steps == 0 {
            return Err(FlowfactError::invariant_violation(
                "max_fixpoint_steps must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AnalysisConfig::default().validate().unwrap();
    }

    #[test]
    fn fanout_exceeding_max_edges_is_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.limits.max_fanout_per_source = cfg.limits.max_edges + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn overlapping_anchor_bases_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.anchor_bases.local_base = cfg.anchor_bases.param_base;
        assert!(cfg.validate().is_err());
    }
}
