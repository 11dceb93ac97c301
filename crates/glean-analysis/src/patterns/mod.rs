//! Pattern model, registry, loader, and the built-in library.
//!
//! Definitions are compiled into the registry once; everything downstream
//! (scoring, detection) reads them without mutation.

pub mod library;
pub mod loader;
pub mod registry;
pub mod types;

pub use loader::TomlPatternLoader;
pub use registry::{CompiledPattern, PatternFilter, PatternRegistry};
pub use types::{
    AppliedFactor, ConfidenceTier, MatchMetadata, NearbyEntity, Normalization, PatternCategory,
    PatternDefinition, PatternFlags, PatternMatch, PatternPriority,
};
