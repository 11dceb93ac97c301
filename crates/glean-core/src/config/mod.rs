//! Configuration system for glean.
//! TOML-based, 3-layer resolution: overrides > env > project > defaults.

pub mod detection_config;
pub mod glean_config;
pub mod scoring_config;

pub use detection_config::DetectionConfig;
pub use glean_config::{ConfigOverrides, GleanConfig};
pub use scoring_config::ScoringConfig;
