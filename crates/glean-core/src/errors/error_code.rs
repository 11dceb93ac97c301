//! Stable error codes for callers that cross an API boundary.

/// Every error enum implements this so API layers can surface a
/// machine-readable code next to the human message.
pub trait GleanErrorCode {
    /// Returns the error code string (e.g., "INVALID_ARGUMENT").
    fn error_code(&self) -> &'static str;

    /// Returns the tagged error string: `[ERROR_CODE] message`.
    fn tagged_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const PATTERN_ERROR: &str = "PATTERN_ERROR";
pub const DETECTION_ERROR: &str = "DETECTION_ERROR";
pub const INVALID_FILTER: &str = "INVALID_FILTER";
