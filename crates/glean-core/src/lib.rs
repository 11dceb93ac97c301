//! Core infrastructure for glean: errors, configuration, and tracing.
//!
//! Nothing in this crate performs detection; `glean-analysis` builds the
//! engine on top of these types.

pub mod config;
pub mod errors;
pub mod tracing;
