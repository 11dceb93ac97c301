//! Confidence scoring configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tunes the built-in confidence factor set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Names of built-in factors to leave out of scoring.
    #[serde(default)]
    pub disabled_factors: Vec<String>,
    /// Per-factor weight overrides, keyed by factor name.
    #[serde(default)]
    pub factor_weights: BTreeMap<String, f64>,
}

impl ScoringConfig {
    /// Whether the named factor has been disabled.
    pub fn is_disabled(&self, factor_name: &str) -> bool {
        self.disabled_factors.iter().any(|n| n == factor_name)
    }

    /// Weight override for the named factor, if one is configured.
    pub fn weight_override(&self, factor_name: &str) -> Option<f64> {
        self.factor_weights.get(factor_name).copied()
    }
}
