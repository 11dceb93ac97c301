//! Error handling for glean.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod detection_error;
pub mod error_code;
pub mod pattern_error;

pub use config_error::ConfigError;
pub use detection_error::DetectionError;
pub use error_code::GleanErrorCode;
pub use pattern_error::PatternError;
