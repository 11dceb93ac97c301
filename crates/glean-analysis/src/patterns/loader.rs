//! Declarative TOML pattern definitions. Extend the engine without recompiling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use glean_core::errors::PatternError;

use super::types::{
    Normalization, PatternCategory, PatternDefinition, PatternFlags, PatternPriority,
    DEFAULT_BASE_CONFIDENCE, DEFAULT_PATTERN_VERSION,
};

/// A TOML-defined pattern definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlPatternDef {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub domain: String,
    pub category: String,
    #[serde(default)]
    pub priority: PatternPriority,
    pub pattern: String,
    #[serde(default)]
    pub flags: PatternFlags,
    pub output_type: String,
    #[serde(default)]
    pub capture_groups: BTreeMap<String, String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub enabled: Option<bool>,
}

fn default_confidence() -> f64 {
    DEFAULT_BASE_CONFIDENCE
}

fn default_version() -> String {
    DEFAULT_PATTERN_VERSION.to_string()
}

/// A collection of TOML pattern definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlPatternFile {
    #[serde(default)]
    pub patterns: Vec<TomlPatternDef>,
}

/// Loader for TOML pattern definitions.
pub struct TomlPatternLoader;

impl TomlPatternLoader {
    /// Load patterns from a TOML string. Disabled entries are skipped.
    pub fn load_from_str(toml_str: &str) -> Result<Vec<PatternDefinition>, PatternError> {
        let file: TomlPatternFile = toml::from_str(toml_str)
            .map_err(|e| PatternError::ParseError(format!("TOML parse error: {e}")))?;

        let mut definitions = Vec::with_capacity(file.patterns.len());
        for def in file.patterns {
            if def.enabled == Some(false) {
                tracing::debug!(pattern_id = %def.id, "skipping disabled pattern");
                continue;
            }
            definitions.push(Self::build(def)?);
        }
        Ok(definitions)
    }

    /// Load patterns from a file path.
    pub fn load_from_file(path: &std::path::Path) -> Result<Vec<PatternDefinition>, PatternError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PatternError::ParseError(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::load_from_str(&content)
    }

    fn build(def: TomlPatternDef) -> Result<PatternDefinition, PatternError> {
        let category = PatternCategory::parse_str(&def.category).ok_or_else(|| {
            PatternError::UnknownCategory(format!("'{}' in pattern '{}'", def.category, def.id))
        })?;

        let mut built = PatternDefinition::new(
            def.id,
            def.name,
            def.domain,
            category,
            def.pattern,
            def.output_type,
        )?
        .with_base_confidence(def.confidence)?
        .with_version(def.version)?
        .with_priority(def.priority)
        .with_flags(def.flags)
        .with_normalization(def.normalization);

        if let Some(description) = def.description {
            built = built.with_description(description);
        }
        for (group, role) in def.capture_groups {
            built = built.with_capture_group(group, role);
        }
        Ok(built)
    }
}
