//! Detection configuration.

use serde::{Deserialize, Serialize};

/// Default characters captured on each side of a match as its local context.
pub const DEFAULT_CONTEXT_WINDOW: usize = 100;

/// Default maximum gap, in characters, between a relationship span and an
/// entity span for the entity to count as nearby.
pub const DEFAULT_PROXIMITY_WINDOW: usize = 100;

/// Configuration for the detection subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Characters on each side of a match kept as `surrounding_context`. Default: 100.
    pub context_window: Option<usize>,
    /// Entity-to-relationship proximity window in characters. Default: 100.
    pub proximity_window: Option<usize>,
    /// Matches scoring strictly below this are dropped. Default: 0.0.
    pub min_confidence: Option<f64>,
    /// Domains used when a caller passes no domain filter. Empty means all.
    #[serde(default)]
    pub default_domains: Vec<String>,
    /// Upper bound on input text size in bytes. Unbounded when unset.
    pub max_text_bytes: Option<usize>,
}

impl DetectionConfig {
    /// Returns the effective context window, defaulting to 100.
    pub fn effective_context_window(&self) -> usize {
        self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }

    /// Returns the effective proximity window, defaulting to 100.
    pub fn effective_proximity_window(&self) -> usize {
        self.proximity_window.unwrap_or(DEFAULT_PROXIMITY_WINDOW)
    }

    /// Returns the effective minimum confidence, defaulting to 0.0.
    pub fn effective_min_confidence(&self) -> f64 {
        self.min_confidence.unwrap_or(0.0)
    }
}
