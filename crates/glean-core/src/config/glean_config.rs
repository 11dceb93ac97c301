//! Top-level glean configuration with layered resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DetectionConfig, ScoringConfig};
use crate::errors::ConfigError;

/// Project config file name looked up in the root passed to `load`.
pub const PROJECT_CONFIG_FILE: &str = "glean.toml";

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Explicit overrides (applied via `apply_overrides`)
/// 2. Environment variables (`GLEAN_*`)
/// 3. Project config (`glean.toml` in the root)
/// 4. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GleanConfig {
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
}

/// Caller-supplied overrides; the highest-priority layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub context_window: Option<usize>,
    pub proximity_window: Option<usize>,
    pub min_confidence: Option<f64>,
    pub default_domains: Option<Vec<String>>,
}

impl GleanConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
            ::tracing::debug!(path = %project_config_path.display(), "merged project config");
        }

        Self::apply_env_overrides(&mut config)?;

        if let Some(o) = overrides {
            Self::apply_overrides(&mut config, o);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &GleanConfig) -> Result<(), ConfigError> {
        if let Some(min) = config.detection.min_confidence {
            if !min.is_finite() || !(0.0..=1.0).contains(&min) {
                return Err(ConfigError::ValidationFailed {
                    field: "detection.min_confidence".to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if config.detection.context_window == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "detection.context_window".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.detection.proximity_window == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "detection.proximity_window".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if config.detection.max_text_bytes == Some(0) {
            return Err(ConfigError::ValidationFailed {
                field: "detection.max_text_bytes".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Some(domain) = config.detection.default_domains.iter().find(|d| d.trim().is_empty()) {
            return Err(ConfigError::ValidationFailed {
                field: "detection.default_domains".to_string(),
                message: format!("blank domain name {domain:?}"),
            });
        }
        for (name, weight) in &config.scoring.factor_weights {
            if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
                return Err(ConfigError::ValidationFailed {
                    field: format!("scoring.factor_weights.{name}"),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are ignored.
    fn merge_toml_file(config: &mut GleanConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let file_config: GleanConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut GleanConfig, other: &GleanConfig) {
        if other.detection.context_window.is_some() {
            base.detection.context_window = other.detection.context_window;
        }
        if other.detection.proximity_window.is_some() {
            base.detection.proximity_window = other.detection.proximity_window;
        }
        if other.detection.min_confidence.is_some() {
            base.detection.min_confidence = other.detection.min_confidence;
        }
        if !other.detection.default_domains.is_empty() {
            base.detection.default_domains = other.detection.default_domains.clone();
        }
        if other.detection.max_text_bytes.is_some() {
            base.detection.max_text_bytes = other.detection.max_text_bytes;
        }

        if !other.scoring.disabled_factors.is_empty() {
            base.scoring.disabled_factors = other.scoring.disabled_factors.clone();
        }
        for (name, weight) in &other.scoring.factor_weights {
            base.scoring.factor_weights.insert(name.clone(), *weight);
        }
    }

    /// Apply environment variable overrides.
    /// Pattern: `GLEAN_DETECTION_CONTEXT_WINDOW`, `GLEAN_SCORING_DISABLED_FACTORS`, etc.
    /// Unparseable values are rejected rather than silently dropped.
    fn apply_env_overrides(config: &mut GleanConfig) -> Result<(), ConfigError> {
        if let Some(v) = env_parse::<usize>("GLEAN_DETECTION_CONTEXT_WINDOW")? {
            config.detection.context_window = Some(v);
        }
        if let Some(v) = env_parse::<usize>("GLEAN_DETECTION_PROXIMITY_WINDOW")? {
            config.detection.proximity_window = Some(v);
        }
        if let Some(v) = env_parse::<f64>("GLEAN_DETECTION_MIN_CONFIDENCE")? {
            config.detection.min_confidence = Some(v);
        }
        if let Ok(val) = std::env::var("GLEAN_SCORING_DISABLED_FACTORS") {
            config.scoring.disabled_factors = split_list(&val);
        }
        if let Ok(val) = std::env::var("GLEAN_DETECTION_DEFAULT_DOMAINS") {
            config.detection.default_domains = split_list(&val);
        }
        Ok(())
    }

    /// Apply explicit overrides (highest priority).
    pub fn apply_overrides(config: &mut GleanConfig, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.context_window {
            config.detection.context_window = Some(v);
        }
        if let Some(v) = overrides.proximity_window {
            config.detection.proximity_window = Some(v);
        }
        if let Some(v) = overrides.min_confidence {
            config.detection.min_confidence = Some(v);
        }
        if let Some(ref v) = overrides.default_domains {
            config.detection.default_domains = v.clone();
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.to_string(),
                message: format!("cannot parse {val:?}"),
            }),
        Err(_) => Ok(None),
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
