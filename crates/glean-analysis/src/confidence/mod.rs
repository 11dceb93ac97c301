//! Context-aware confidence scoring.
//!
//! A match starts at its pattern's base confidence. Each applicable factor
//! whose detector fires on the match's context adds a signed, bounded
//! adjustment; the total is clamped into `[0, 1]`.

pub mod detectors;
pub mod factor;
pub mod scorer;

pub use detectors::{ContextDetector, DetectorFn};
pub use factor::{default_factors, ConfidenceFactor};
pub use scorer::ConfidenceScorer;
