//! Browser session abstraction.
//!
//! Everything the flow knows about a browser goes through [`BrowserSession`]:
//! navigation, typed script evaluation, native dialog presence/accept and
//! file attachment. `ChromiumSession` (feature `browser`) drives a real
//! Chromium over CDP; `ScriptedSession` models a page in memory for tests.

use crate::dialog::Dialog;
use crate::locator::Selector;
use crate::result::{FormError, FormResult};
use crate::script::PageScript;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One `<option>` of a select control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Option value (empty for placeholders)
    pub value: String,
    /// Visible option text
    #[serde(default)]
    pub label: String,
}

impl SelectOption {
    /// Create an option
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Empty-value placeholder option
    #[must_use]
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new("", label)
    }

    /// Whether this option carries no value
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.value.is_empty()
    }
}

/// Observed state of a select control
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectSnapshot {
    /// Whether the control is disabled
    #[serde(default)]
    pub disabled: bool,
    /// Currently selected value
    #[serde(default)]
    pub value: String,
    /// Options in document order
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl SelectSnapshot {
    /// Whether more than the placeholder entry is present and the control is enabled
    #[must_use]
    pub fn is_populated(&self) -> bool {
        !self.disabled && self.options.len() > 1
    }

    /// First option with a non-empty value
    #[must_use]
    pub fn first_available(&self) -> Option<&SelectOption> {
        self.options.iter().find(|o| !o.is_placeholder())
    }

    /// Whether an option with `value` exists
    #[must_use]
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// Abstract browser session used serially by one run
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to an absolute URL and wait for the document to load
    async fn navigate(&mut self, url: &str) -> FormResult<()>;

    /// Current browsing location
    async fn current_url(&self) -> FormResult<String>;

    /// Evaluate a typed script, returning its JSON result
    async fn evaluate(&self, script: &PageScript) -> FormResult<serde_json::Value>;

    /// Native dialog currently blocking the page, if any
    async fn pending_dialog(&self) -> FormResult<Option<Dialog>>;

    /// Accept the pending native dialog
    async fn accept_dialog(&self) -> FormResult<()>;

    /// Attach files to the file input matched by `selector`
    async fn attach_files(&self, selector: &Selector, files: &[PathBuf]) -> FormResult<()>;

    /// Release the session (idempotent)
    async fn close(&mut self) -> FormResult<()>;
}

/// Evaluate a script and decode its result
pub async fn evaluate_as<T: DeserializeOwned>(
    session: &dyn BrowserSession,
    script: &PageScript,
) -> FormResult<T> {
    let value = session.evaluate(script).await?;
    serde_json::from_value(value).map_err(|e| {
        FormError::session(format!("unexpected result from `{}`: {e}", script.name()))
    })
}

/// Whether `selector` matches an element right now
pub async fn element_exists(session: &dyn BrowserSession, selector: &Selector) -> FormResult<bool> {
    evaluate_as(session, &PageScript::Exists(selector.clone())).await
}

/// Current `value` of a control, `None` when absent
pub async fn read_value(
    session: &dyn BrowserSession,
    selector: &Selector,
) -> FormResult<Option<String>> {
    evaluate_as(session, &PageScript::ReadValue(selector.clone())).await
}

/// State of a select control, `None` when absent
pub async fn read_select(
    session: &dyn BrowserSession,
    selector: &Selector,
) -> FormResult<Option<SelectSnapshot>> {
    evaluate_as(session, &PageScript::ReadSelect(selector.clone())).await
}
