//! Result and error types for Formpilot.

use thiserror::Error;

/// Result type for Formpilot operations
pub type FormResult<T> = Result<T, FormError>;

/// Errors that can occur while driving a form
#[derive(Debug, Error)]
pub enum FormError {
    /// No element matched a logical field in the current DOM snapshot
    #[error("Locator not found for `{field}` ({selector})")]
    LocatorNotFound {
        /// Logical field name
        field: String,
        /// Rendered selector(s) that were tried
        selector: String,
    },

    /// A written value never became visible through the element
    #[error("Field {selector} did not settle: expected {expected:?}, observed {observed:?}")]
    FieldNotSettled {
        /// Selector of the control
        selector: String,
        /// Value that was written
        expected: String,
        /// Last value read back, if any
        observed: Option<String>,
    },

    /// A select stayed at placeholder size until the deadline
    #[error("No options available in {selector} (saw {option_count} option(s))")]
    NoOptionsAvailable {
        /// Selector of the select control
        selector: String,
        /// Number of options observed at the deadline
        option_count: usize,
    },

    /// Login did not produce a session
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed {
        /// What went wrong
        reason: String,
    },

    /// Neither a dialog nor a redirect confirmed the submission
    #[error("Submission not confirmed after {waited_ms}ms: {detail}")]
    SubmissionNotConfirmed {
        /// Total time spent waiting
        waited_ms: u64,
        /// Description of the last observed state
        detail: String,
    },

    /// Post-submit state did not match the expected artifact
    #[error("Verification failed: expected {expected}, got {actual}")]
    VerificationFailed {
        /// Expected URL pattern or content
        expected: String,
        /// What was observed instead
        actual: String,
    },

    /// A required field had no value before submission (precondition)
    #[error("Required field `{field}` has no value")]
    MissingRequiredField {
        /// Logical field name
        field: String,
    },

    /// The payload fixture is malformed
    #[error("Invalid payload: {message}")]
    InvalidPayload {
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Browser session error (CDP transport, script evaluation)
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// Create a session error
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Create an invalid payload error
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind, used in reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocatorNotFound { .. } => "LocatorNotFound",
            Self::FieldNotSettled { .. } => "FieldNotSettled",
            Self::NoOptionsAvailable { .. } => "NoOptionsAvailable",
            Self::AuthenticationFailed { .. } => "AuthenticationFailed",
            Self::SubmissionNotConfirmed { .. } => "SubmissionNotConfirmed",
            Self::VerificationFailed { .. } => "VerificationFailed",
            Self::MissingRequiredField { .. } => "MissingRequiredField",
            Self::InvalidPayload { .. } => "InvalidPayload",
            Self::Timeout { .. } => "Timeout",
            Self::Session { .. } => "Session",
            Self::BrowserLaunch { .. } => "BrowserLaunch",
            Self::Navigation { .. } => "Navigation",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
        }
    }

    /// Attribute a control-level error to the logical field it was raised for.
    ///
    /// Control helpers only know the selector, so locator errors get `field`
    /// replaced and settle errors get the field name in front of the selector.
    #[must_use]
    pub fn in_field(self, field: &str) -> Self {
        match self {
            Self::LocatorNotFound { selector, .. } => Self::LocatorNotFound {
                field: field.to_string(),
                selector,
            },
            Self::FieldNotSettled {
                selector,
                expected,
                observed,
            } => Self::FieldNotSettled {
                selector: format!("`{field}` ({selector})"),
                expected,
                observed,
            },
            Self::NoOptionsAvailable {
                selector,
                option_count,
            } => Self::NoOptionsAvailable {
                selector: format!("`{field}` ({selector})"),
                option_count,
            },
            other => other,
        }
    }

    /// Whether the error is a precondition failure rather than a failure of the target system
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredField { .. } | Self::InvalidPayload { .. }
        )
    }
}
