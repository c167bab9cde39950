//! Native dialogs and submission confirmation.
//!
//! After a submit, the application confirms either through a native modal
//! dialog or by navigating away from the form, and the two signals race.
//! [`ConfirmationRace`] observes both on every poll and settles on whichever
//! arrives first.

use crate::driver::BrowserSession;
use crate::result::{FormError, FormResult};
use crate::wait::{is_timeout, wait_for, WaitOptions};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Type of browser dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
    /// Before unload dialog (Leave/Stay buttons)
    BeforeUnload,
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
            Self::BeforeUnload => write!(f, "beforeunload"),
        }
    }
}

/// A native dialog blocking the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
}

impl Dialog {
    /// Create a new dialog
    #[must_use]
    pub fn new(dialog_type: DialogType, message: impl Into<String>) -> Self {
        Self {
            dialog_type,
            message: message.into(),
        }
    }

    /// Create an alert dialog
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogType::Alert, message)
    }

    /// Get dialog type
    #[must_use]
    pub const fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Get dialog message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The signal that confirmed a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum Confirmation {
    /// A dialog appeared (and was accepted)
    Dialog {
        /// Dialog text
        message: String,
    },
    /// The location left the form
    Redirect {
        /// Location observed
        url: String,
    },
}

impl Confirmation {
    /// Dialog text, if confirmed by a dialog
    #[must_use]
    pub fn dialog_text(&self) -> Option<&str> {
        match self {
            Self::Dialog { message } => Some(message),
            Self::Redirect { .. } => None,
        }
    }
}

/// State of a confirmation race
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceState {
    /// Neither signal has arrived
    Waiting,
    /// A signal arrived first
    Settled(Confirmation),
    /// A dialog arrived carrying a failure marker
    Rejected(String),
}

/// First-arrival resolution of dialog vs. redirect
#[derive(Debug, Clone)]
pub struct ConfirmationRace {
    origin_url: String,
    failure_markers: Vec<String>,
    max_attempts: u32,
    attempts: u32,
    state: RaceState,
    last_dialog_text: Option<String>,
}

impl ConfirmationRace {
    /// Start a race for a submission made from `origin_url`
    #[must_use]
    pub fn new(origin_url: impl Into<String>) -> Self {
        Self {
            origin_url: origin_url.into(),
            failure_markers: Vec::new(),
            max_attempts: 3,
            attempts: 0,
            state: RaceState::Waiting,
            last_dialog_text: None,
        }
    }

    /// Dialog texts containing any of these markers reject the submission
    #[must_use]
    pub fn with_failure_markers(mut self, markers: Vec<String>) -> Self {
        self.failure_markers = markers;
        self
    }

    /// Bound on resolution attempts
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &RaceState {
        &self.state
    }

    /// Attempts used so far
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Text of the last dialog seen, if any
    #[must_use]
    pub fn last_dialog_text(&self) -> Option<&str> {
        self.last_dialog_text.as_deref()
    }

    /// Feed one observation of both signals.
    ///
    /// A dialog wins over a simultaneous location change: a dialog blocks the
    /// page, so a location observed alongside it was committed before it.
    /// Once settled, later observations are ignored.
    pub fn observe(&mut self, dialog: Option<&Dialog>, url: &str) -> &RaceState {
        if self.state != RaceState::Waiting {
            return &self.state;
        }
        if let Some(dialog) = dialog {
            let message = dialog.message().to_string();
            self.last_dialog_text = Some(message.clone());
            self.state = if self.is_failure(&message) {
                RaceState::Rejected(message)
            } else {
                RaceState::Settled(Confirmation::Dialog { message })
            };
        } else if self.has_left_origin(url) {
            self.state = RaceState::Settled(Confirmation::Redirect {
                url: url.to_string(),
            });
        }
        &self.state
    }

    fn is_failure(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.failure_markers
            .iter()
            .any(|m| !m.is_empty() && lowered.contains(&m.to_lowercase()))
    }

    fn has_left_origin(&self, url: &str) -> bool {
        !url.is_empty() && strip_fragment(url) != strip_fragment(&self.origin_url)
    }

    /// Drive the race against a live session.
    ///
    /// Each attempt polls both signals for one `window`. An attempt that
    /// expires, or whose poll hits a transient session error while the page
    /// is mid-navigation, is retried until `max_attempts` is used up. A dialog
    /// is accepted as soon as it is observed.
    pub async fn resolve(
        &mut self,
        session: &dyn BrowserSession,
        window: &WaitOptions,
    ) -> FormResult<Confirmation> {
        let started = Instant::now();
        let mut last_error: Option<FormError> = None;

        while self.attempts < self.max_attempts {
            self.attempts += 1;
            let attempt = self.attempts;
            let race: &Self = self;
            let outcome = wait_for(
                move || async move {
                    let dialog = session.pending_dialog().await?;
                    let url = session.current_url().await?;
                    Ok(Some((dialog, url)).filter(|(d, u)| d.is_some() || race.has_left_origin(u)))
                },
                window,
                "submission confirmation",
            )
            .await;

            match outcome {
                Ok(found) => {
                    let (dialog, url) = found.value;
                    if dialog.is_some() {
                        session.accept_dialog().await?;
                    }
                    match self.observe(dialog.as_ref(), &url).clone() {
                        RaceState::Settled(confirmation) => {
                            tracing::info!(attempt, ?confirmation, "submission confirmed");
                            return Ok(confirmation);
                        }
                        RaceState::Rejected(message) => {
                            return Err(FormError::SubmissionNotConfirmed {
                                waited_ms: elapsed_ms(started),
                                detail: format!("application rejected the submission: {message}"),
                            });
                        }
                        RaceState::Waiting => {}
                    }
                }
                Err(err) if is_timeout(&err) || matches!(err, FormError::Session { .. }) => {
                    tracing::warn!(attempt, max = self.max_attempts, error = %err, "confirmation attempt failed");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let detail = match (&self.last_dialog_text, last_error) {
            (Some(text), _) => format!("last dialog: {text}"),
            (None, Some(err)) => format!(
                "neither dialog nor redirect after {} attempt(s): {err}",
                self.attempts
            ),
            (None, None) => "neither dialog nor redirect".to_string(),
        };
        Err(FormError::SubmissionNotConfirmed {
            waited_ms: elapsed_ms(started),
            detail,
        })
    }
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
