//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable read for log directives.
pub const LOG_ENV_VAR: &str = "GLEAN_LOG";

/// Initialize the glean tracing/logging system.
///
/// Reads `GLEAN_LOG` for per-module log levels, e.g.
/// `GLEAN_LOG=glean_analysis=debug,glean_core=warn`.
/// Falls back to `glean=info` if `GLEAN_LOG` is unset or invalid.
///
/// Idempotent. A subscriber installed elsewhere first is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("glean=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}
