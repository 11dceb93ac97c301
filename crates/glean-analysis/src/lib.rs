//! Rule-based pattern detection and confidence scoring.
//!
//! Pipeline: [`patterns::PatternRegistry`] holds compiled definitions,
//! [`detection::PatternDetector`] runs them over text, and
//! [`confidence::ConfidenceScorer`] adjusts each match's base confidence
//! from textual signals around it.

pub mod confidence;
pub mod detection;
pub mod patterns;

pub use confidence::{ConfidenceFactor, ConfidenceScorer, ContextDetector};
pub use detection::{
    DetectionFilter, DetectionStats, DocumentAnalysis, DocumentInput, PatternDetector,
};
pub use patterns::{
    PatternCategory, PatternDefinition, PatternMatch, PatternPriority, PatternRegistry,
    TomlPatternLoader,
};
