//! Pattern detection: the orchestrator callers interact with.

pub mod context;
pub mod detector;
pub mod stats;

pub use detector::{DetectionFilter, DocumentAnalysis, DocumentInput, PatternDetector};
pub use stats::{compile_statistics, DetectionStats};
