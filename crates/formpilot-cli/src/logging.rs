//! Tracing subscriber installation

use crate::config::{LogFormat, Verbosity};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
#[must_use]
pub fn default_directives(verbosity: Verbosity) -> String {
    let level = verbosity.log_level();
    format!("formpilot={level},formpilot_cli={level}")
}

/// Install the global subscriber; `RUST_LOG` wins over the verbosity flags.
///
/// Log lines go to stderr so stdout stays reserved for command output.
pub fn init_tracing(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
