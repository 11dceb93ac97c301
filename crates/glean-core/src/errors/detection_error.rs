//! Detection errors.

use super::error_code::{self, GleanErrorCode};
use super::PatternError;

/// Errors surfaced by a detection call.
///
/// Empty text, no applicable patterns, and no matches above threshold are
/// never errors; they produce empty results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Pattern configuration error: {0}")]
    Pattern(#[from] PatternError),
}

impl GleanErrorCode for DetectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFilter(_) => error_code::INVALID_FILTER,
            Self::Pattern(e) => e.error_code(),
        }
    }
}
