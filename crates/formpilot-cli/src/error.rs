//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The payload fixture does not satisfy the form
    #[error("Invalid fixture: {message}")]
    InvalidFixture {
        /// Error message
        message: String,
    },

    /// A run ended in a failed step
    #[error("Run failed at step `{step}`: {message}")]
    RunFailed {
        /// Failed step
        step: String,
        /// Error message
        message: String,
    },

    /// Async runtime could not be created
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formpilot library error
    #[error("Formpilot error: {0}")]
    Form(#[from] formpilot::FormError),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid fixture error
    #[must_use]
    pub fn invalid_fixture(message: impl Into<String>) -> Self {
        Self::InvalidFixture {
            message: message.into(),
        }
    }

    /// Create a runtime error
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

impl From<formpilot::StepFailure> for CliError {
    fn from(failure: formpilot::StepFailure) -> Self {
        Self::RunFailed {
            step: failure.step.to_string(),
            message: failure.error.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use formpilot::{DiagnosticSnapshot, FlowStep, FormError, StepFailure};

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_fixture_error() {
        let err = CliError::invalid_fixture("`year` is missing");
        assert!(err.to_string().contains("Invalid fixture"));
    }

    #[test]
    fn test_step_failure_conversion() {
        let failure = StepFailure {
            step: FlowStep::PopulateFields,
            error: FormError::NoOptionsAvailable {
                selector: "testid=brand".into(),
                option_count: 1,
            },
            snapshot: DiagnosticSnapshot::default(),
        };
        let err: CliError = failure.into();
        let msg = err.to_string();
        assert!(msg.contains("populate_fields"));
        assert!(msg.contains("testid=brand"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
