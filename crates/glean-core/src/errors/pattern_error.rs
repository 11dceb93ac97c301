//! Pattern configuration errors.
//!
//! Raised while building pattern definitions, confidence factors, or
//! registries. These are fatal to the configuration unit that produced them.

use super::error_code::{self, GleanErrorCode};

/// Errors in pattern or factor configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Regex compilation failed for pattern '{pattern_id}': {message}")]
    RegexCompilation { pattern_id: String, message: String },

    #[error("Unknown context detector: {0}")]
    UnknownDetector(String),

    #[error("Unknown pattern category: {0}")]
    UnknownCategory(String),

    #[error("Pattern file parse error: {0}")]
    ParseError(String),
}

impl PatternError {
    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Validate that `value` is a finite number in `[0.0, 1.0]`.
    pub fn check_unit_interval(field: &str, value: f64) -> Result<f64, Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(Self::invalid(
                field,
                format!("must be between 0.0 and 1.0, got {value}"),
            ))
        }
    }
}

impl GleanErrorCode for PatternError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => error_code::INVALID_ARGUMENT,
            _ => error_code::PATTERN_ERROR,
        }
    }
}
