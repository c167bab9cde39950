//! Outcome verification.
//!
//! After a confirmed submission the browsing location must reach the
//! expected pattern and the submitted title must render. Both are polled
//! within the verification window and surface as
//! [`FormError::VerificationFailed`] when they never hold.

use crate::dialog::Confirmation;
use crate::driver::{evaluate_as, BrowserSession};
use crate::result::{FormError, FormResult};
use crate::script::PageScript;
use crate::wait::{is_timeout, wait_for, WaitOptions};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

/// URL pattern for matching browsing locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "pattern", rename_all = "snake_case")]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "*/listings/*")
    Glob(String),
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => glob_matches(pattern, url),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Prefix(p) => write!(f, "url starts with {p}"),
            Self::Contains(p) => write!(f, "url contains {p}"),
            Self::Regex(p) => write!(f, "url =~ /{p}/"),
            Self::Glob(p) => write!(f, "url like {p}"),
        }
    }
}

/// `*` matches any run of characters. Segments between stars match leftmost,
/// the last segment is anchored to the end of the URL.
fn glob_matches(pattern: &str, url: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(mut rest) = parts.next().and_then(|first| url.strip_prefix(first)) else {
        return false;
    };
    let mut tail: Vec<&str> = parts.collect();
    let Some(last) = tail.pop() else {
        return rest.is_empty();
    };
    for part in tail {
        match rest.find(part) {
            Some(found) => rest = &rest[found + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Result of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Whether the run completed every step
    pub success: bool,
    /// Browsing location at the end of the run
    pub final_url: String,
    /// Text of the last confirmation dialog observed
    pub confirmation_text: Option<String>,
    /// Signal that confirmed the submission
    pub confirmation: Option<Confirmation>,
}

/// Polls post-submit state
#[derive(Clone, Copy)]
pub struct OutcomeVerifier<'a> {
    session: &'a dyn BrowserSession,
    wait: WaitOptions,
}

impl fmt::Debug for OutcomeVerifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeVerifier")
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl<'a> OutcomeVerifier<'a> {
    /// Create a verifier
    #[must_use]
    pub fn new(session: &'a dyn BrowserSession, wait: WaitOptions) -> Self {
        Self { session, wait }
    }

    /// Wait until the location matches `pattern`, returning it
    pub async fn await_location(&self, pattern: &UrlPattern) -> FormResult<String> {
        let session = self.session;
        let last = RefCell::new(String::new());
        let last_ref = &last;
        let found = wait_for(
            move || async move {
                let url = session.current_url().await?;
                let hit = pattern.matches(&url);
                *last_ref.borrow_mut() = url.clone();
                Ok(hit.then_some(url))
            },
            &self.wait,
            "post-submission location",
        )
        .await;
        match found {
            Ok(result) => {
                tracing::info!(url = %result.value, "location matched");
                Ok(result.value)
            }
            Err(err) if is_timeout(&err) => Err(FormError::VerificationFailed {
                expected: pattern.to_string(),
                actual: last.into_inner(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Wait until `text` is rendered.
    ///
    /// A dialog raised while waiting is accepted so the page can render; its
    /// text is returned.
    pub async fn await_content(&self, text: &str) -> FormResult<Option<String>> {
        let session = self.session;
        let late_dialog: RefCell<Option<String>> = RefCell::new(None);
        let late_ref = &late_dialog;
        let found = wait_for(
            move || async move {
                if let Some(dialog) = session.pending_dialog().await? {
                    tracing::warn!(message = dialog.message(), "accepting dialog raised during verification");
                    session.accept_dialog().await?;
                    *late_ref.borrow_mut() = Some(dialog.message().to_string());
                    return Ok(None);
                }
                let present: bool =
                    evaluate_as(session, &PageScript::TextPresent(text.to_string())).await?;
                Ok(present.then_some(()))
            },
            &self.wait,
            "submitted content",
        )
        .await;
        match found {
            Ok(_) => {
                tracing::info!(text, "content rendered");
                Ok(late_dialog.into_inner())
            }
            Err(err) if is_timeout(&err) => {
                let url = self.session.current_url().await.unwrap_or_default();
                Err(FormError::VerificationFailed {
                    expected: format!("text {text:?} rendered"),
                    actual: format!("text absent at {url}"),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Assert a finished run matches `pattern` and renders `expected_title`
    pub async fn verify(
        &self,
        outcome: &RunOutcome,
        pattern: &UrlPattern,
        expected_title: &str,
    ) -> FormResult<()> {
        if !outcome.success {
            return Err(FormError::VerificationFailed {
                expected: "successful run".to_string(),
                actual: format!("run failed at {}", outcome.final_url),
            });
        }
        if !pattern.matches(&outcome.final_url) {
            self.await_location(pattern).await?;
        }
        self.await_content(expected_title).await?;
        Ok(())
    }
}
