//! Flow orchestration.
//!
//! A run is a fixed sequence of steps, each blocking until it completes or
//! failing the whole run:
//!
//! ```text
//! validate payload → load entry → authenticate → confirm authentication
//!   → open form → populate fields → submit → resolve confirmation
//!   → await redirect → await content
//! ```
//!
//! No step is retried. The only retry is the bounded dialog-vs-redirect
//! resolution inside `ResolveConfirmation`. A failing step is reported as a
//! [`StepFailure`] carrying the step, the typed error and a diagnostic
//! snapshot of the page at failure time.

use crate::dialog::ConfirmationRace;
use crate::driver::{element_exists, evaluate_as, BrowserSession};
use crate::field::FieldSetter;
use crate::locator::Selector;
use crate::page_object::{FieldDescriptor, FieldKind, FormPage, PageObject};
use crate::pages::{auth_modal, fields, listing_form, AuthModal, DEFAULT_TOKEN_KEY, LISTING_FORM_PATH};
use crate::payload::{Credentials, FieldValue, FormPayload};
use crate::result::{FormError, FormResult};
use crate::script::{BindingMode, PageScript};
use crate::select::{Choice, SelectResolver};
use crate::verify::{OutcomeVerifier, RunOutcome, UrlPattern};
use crate::wait::{is_timeout, wait_for, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Instrument;

/// Default window for a native dialog to appear (15 seconds)
pub const DEFAULT_DIALOG_TIMEOUT_MS: u64 = 15_000;

/// Default bound on confirmation resolution attempts
pub const DEFAULT_CONFIRMATION_RETRIES: u32 = 3;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Wait durations of a run, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Element appearance and field settling
    pub element_ms: u64,
    /// Post-submission redirect and content
    pub submission_ms: u64,
    /// Native dialog appearance, per confirmation attempt
    pub dialog_ms: u64,
    /// Poll interval of every wait
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_ms: DEFAULT_WAIT_TIMEOUT_MS,
            submission_ms: DEFAULT_WAIT_TIMEOUT_MS,
            dialog_ms: DEFAULT_DIALOG_TIMEOUT_MS,
            poll_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Timeouts {
    /// Set every timeout to `ms` (useful for tests)
    #[must_use]
    pub const fn uniform(ms: u64, poll_ms: u64) -> Self {
        Self {
            element_ms: ms,
            submission_ms: ms,
            dialog_ms: ms,
            poll_ms,
        }
    }

    /// Wait options for element waits
    #[must_use]
    pub const fn element(&self) -> WaitOptions {
        self.options(self.element_ms)
    }

    /// Wait options for post-submission waits
    #[must_use]
    pub const fn submission(&self) -> WaitOptions {
        self.options(self.submission_ms)
    }

    /// Wait options for dialog waits
    #[must_use]
    pub const fn dialog(&self) -> WaitOptions {
        self.options(self.dialog_ms)
    }

    const fn options(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions {
            timeout_ms,
            poll_interval_ms: self.poll_ms,
        }
    }
}

/// Configuration of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Base endpoint of the application
    pub base_url: String,
    /// Path of the creation form
    pub form_path: String,
    /// `localStorage` key of the session token
    pub token_key: String,
    /// Expected location after a successful submission
    pub success_pattern: UrlPattern,
    /// Wait durations
    pub timeouts: Timeouts,
    /// How values are written into controls
    pub binding: BindingMode,
    /// Bound on confirmation resolution attempts
    pub confirmation_retries: u32,
    /// Dialog texts containing any of these reject the submission
    pub failure_markers: Vec<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            form_path: LISTING_FORM_PATH.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            success_pattern: UrlPattern::Contains("/listings/self".to_string()),
            timeouts: Timeouts::default(),
            binding: BindingMode::default(),
            confirmation_retries: DEFAULT_CONFIRMATION_RETRIES,
            failure_markers: vec!["thất bại".to_string()],
        }
    }
}

impl FlowConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base endpoint
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the wait durations
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the binding mode
    #[must_use]
    pub const fn with_binding(mut self, binding: BindingMode) -> Self {
        self.binding = binding;
        self
    }

    /// Set the expected post-submission location
    #[must_use]
    pub fn with_success_pattern(mut self, pattern: UrlPattern) -> Self {
        self.success_pattern = pattern;
        self
    }

    /// Set the confirmation attempt bound
    #[must_use]
    pub const fn with_confirmation_retries(mut self, retries: u32) -> Self {
        self.confirmation_retries = retries;
        self
    }

    /// Absolute URL of a path under the base endpoint
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// STEPS AND FAILURES
// =============================================================================

/// A step of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    /// Check the payload against the form's required fields
    ValidatePayload,
    /// Load the entry page
    LoadEntry,
    /// Open the login modal, fill and submit it
    Authenticate,
    /// Accept the login dialog and require a session token
    ConfirmAuthentication,
    /// Navigate to the form and wait for its submit control
    OpenForm,
    /// Populate every field in dependency order
    PopulateFields,
    /// Activate the submit control
    Submit,
    /// Resolve the dialog-vs-redirect race
    ResolveConfirmation,
    /// Wait for the post-submission location
    AwaitRedirect,
    /// Wait for the submitted title to render
    AwaitContent,
}

impl FlowStep {
    /// Every step in execution order
    pub const ALL: [Self; 10] = [
        Self::ValidatePayload,
        Self::LoadEntry,
        Self::Authenticate,
        Self::ConfirmAuthentication,
        Self::OpenForm,
        Self::PopulateFields,
        Self::Submit,
        Self::ResolveConfirmation,
        Self::AwaitRedirect,
        Self::AwaitContent,
    ];

    /// Snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidatePayload => "validate_payload",
            Self::LoadEntry => "load_entry",
            Self::Authenticate => "authenticate",
            Self::ConfirmAuthentication => "confirm_authentication",
            Self::OpenForm => "open_form",
            Self::PopulateFields => "populate_fields",
            Self::Submit => "submit",
            Self::ResolveConfirmation => "resolve_confirmation",
            Self::AwaitRedirect => "await_redirect",
            Self::AwaitContent => "await_content",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page state captured when a run fails
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSnapshot {
    /// Browsing location at failure time
    pub final_url: Option<String>,
    /// Text of the last confirmation dialog observed
    pub confirmation_text: Option<String>,
    /// Serialized document, unless a dialog blocked the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_source: Option<String>,
}

impl DiagnosticSnapshot {
    /// Capture what the session can still report; never fails
    pub async fn capture(session: &dyn BrowserSession, confirmation_text: Option<String>) -> Self {
        let final_url = session.current_url().await.ok();
        let blocked = matches!(session.pending_dialog().await, Ok(Some(_)));
        let confirmation_text = if blocked {
            match session.pending_dialog().await {
                Ok(Some(dialog)) => Some(dialog.message().to_string()),
                _ => confirmation_text,
            }
        } else {
            confirmation_text
        };
        let page_source = if blocked {
            None
        } else {
            evaluate_as::<String>(session, &PageScript::PageSource).await.ok()
        };
        Self {
            final_url,
            confirmation_text,
            page_source,
        }
    }
}

/// A failed run: the step, its typed error and the page state
#[derive(Debug, thiserror::Error)]
#[error("step `{step}` failed: {error}")]
pub struct StepFailure {
    /// Step that failed
    pub step: FlowStep,
    /// Typed error naming the field or selector involved
    #[source]
    pub error: FormError,
    /// Page state at failure time
    pub snapshot: DiagnosticSnapshot,
}

// =============================================================================
// RUNNER
// =============================================================================

#[derive(Debug)]
struct Progress {
    step: FlowStep,
    confirmation_text: Option<String>,
}

/// Sequences one run against a session
#[derive(Debug, Clone)]
pub struct FlowRunner {
    config: FlowConfig,
    auth: AuthModal,
    form: FormPage,
}

impl FlowRunner {
    /// Create a runner for the listing application
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        let auth = auth_modal().with_token_key(config.token_key.clone());
        let form = listing_form().with_path(config.form_path.clone());
        Self { config, auth, form }
    }

    /// Use a different login modal
    #[must_use]
    pub fn with_auth(mut self, auth: AuthModal) -> Self {
        self.auth = auth;
        self
    }

    /// Use a different form
    #[must_use]
    pub fn with_form(mut self, form: FormPage) -> Self {
        self.form = form;
        self
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Form in use
    #[must_use]
    pub const fn form(&self) -> &FormPage {
        &self.form
    }

    /// Run the whole flow once
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        payload: &FormPayload,
        credentials: &Credentials,
    ) -> Result<RunOutcome, StepFailure> {
        let mut progress = Progress {
            step: FlowStep::ValidatePayload,
            confirmation_text: None,
        };
        let started = Instant::now();
        match self.execute(session, payload, credentials, &mut progress).await {
            Ok(outcome) => {
                tracing::info!(
                    final_url = %outcome.final_url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run succeeded"
                );
                Ok(outcome)
            }
            Err(error) => {
                let snapshot =
                    DiagnosticSnapshot::capture(&*session, progress.confirmation_text.clone()).await;
                tracing::error!(step = %progress.step, error = %error, "run failed");
                Err(StepFailure {
                    step: progress.step,
                    error,
                    snapshot,
                })
            }
        }
    }

    async fn execute(
        &self,
        session: &mut dyn BrowserSession,
        payload: &FormPayload,
        credentials: &Credentials,
        progress: &mut Progress,
    ) -> FormResult<RunOutcome> {
        let title = step(progress, FlowStep::ValidatePayload, async {
            payload.validate(self.form.registry())?;
            payload.title().ok_or_else(|| FormError::MissingRequiredField {
                field: fields::TITLE.to_string(),
            })
        })
        .await?;

        step(progress, FlowStep::LoadEntry, self.load_entry(session)).await?;
        step(progress, FlowStep::Authenticate, self.authenticate(&*session, credentials)).await?;
        let login_dialog = step(
            progress,
            FlowStep::ConfirmAuthentication,
            self.confirm_authentication(&*session),
        )
        .await?;
        progress.confirmation_text = login_dialog;

        step(progress, FlowStep::OpenForm, self.open_form(session)).await?;
        step(progress, FlowStep::PopulateFields, self.populate(&*session, payload)).await?;
        let origin_url = step(progress, FlowStep::Submit, self.submit(&*session)).await?;

        let mut race = ConfirmationRace::new(origin_url)
            .with_failure_markers(self.config.failure_markers.clone())
            .with_max_attempts(self.config.confirmation_retries);
        let dialog_window = self.config.timeouts.dialog();
        let resolved = step(
            progress,
            FlowStep::ResolveConfirmation,
            race.resolve(&*session, &dialog_window),
        )
        .await;
        if let Some(text) = race.last_dialog_text() {
            progress.confirmation_text = Some(text.to_string());
        }
        let confirmation = resolved?;

        let verifier = OutcomeVerifier::new(&*session, self.config.timeouts.submission());
        let final_url = step(
            progress,
            FlowStep::AwaitRedirect,
            verifier.await_location(&self.config.success_pattern),
        )
        .await?;
        let late_dialog = step(progress, FlowStep::AwaitContent, verifier.await_content(&title)).await?;
        if late_dialog.is_some() {
            progress.confirmation_text = late_dialog;
        }

        Ok(RunOutcome {
            success: true,
            final_url,
            confirmation_text: progress.confirmation_text.clone(),
            confirmation: Some(confirmation),
        })
    }

    async fn load_entry(&self, session: &mut dyn BrowserSession) -> FormResult<()> {
        session.navigate(&self.config.url(self.auth.path())).await?;
        await_element(&*session, "login trigger", self.auth.ready_marker(), &self.config.timeouts.element())
            .await
    }

    async fn authenticate(
        &self,
        session: &dyn BrowserSession,
        credentials: &Credentials,
    ) -> FormResult<()> {
        if credentials.is_blank() {
            return Err(FormError::AuthenticationFailed {
                reason: "identifier or secret is empty".to_string(),
            });
        }
        let element_wait = self.config.timeouts.element();
        activate(session, "login trigger", self.auth.trigger()).await?;

        let setter = FieldSetter::new(session, element_wait).with_binding(self.config.binding);
        let registry = self.auth.registry();
        let identifier = registry
            .resolve_within(session, fields::IDENTIFIER, &element_wait)
            .await?;
        setter.set_value(&identifier, credentials.identifier()).await?;
        let secret = registry
            .resolve_within(session, fields::SECRET, &element_wait)
            .await?;
        setter.set_value(&secret, credentials.secret()).await?;

        await_element(session, "login submit", self.auth.submit_control(), &element_wait).await?;
        activate(session, "login submit", self.auth.submit_control()).await
    }

    /// Accept whatever dialog the login raises, then require a session token
    async fn confirm_authentication(
        &self,
        session: &dyn BrowserSession,
    ) -> FormResult<Option<String>> {
        let key = self.auth.token_key();
        let last_dialog: RefCell<Option<String>> = RefCell::new(None);
        let last_ref = &last_dialog;
        let waited = wait_for(
            move || async move {
                if let Some(dialog) = session.pending_dialog().await? {
                    tracing::info!(message = dialog.message(), "accepting login dialog");
                    session.accept_dialog().await?;
                    *last_ref.borrow_mut() = Some(dialog.message().to_string());
                    return Ok(None);
                }
                let token: Option<String> =
                    evaluate_as(session, &PageScript::StorageItem(key.to_string())).await?;
                Ok(token.filter(|t| !t.is_empty()))
            },
            &self.config.timeouts.dialog(),
            "session token",
        )
        .await;
        let last_dialog = last_dialog.into_inner();
        match waited {
            Ok(_) => {
                tracing::info!(key, "session token present");
                Ok(last_dialog)
            }
            Err(err) if is_timeout(&err) => {
                let reason = match &last_dialog {
                    Some(text) => format!("no session token `{key}` after dialog {text:?}"),
                    None => format!("no session token `{key}` after confirmation"),
                };
                Err(FormError::AuthenticationFailed { reason })
            }
            Err(err) => Err(err),
        }
    }

    async fn open_form(&self, session: &mut dyn BrowserSession) -> FormResult<()> {
        session.navigate(&self.config.url(self.form.path())).await?;
        await_element(
            &*session,
            "form submit",
            self.form.ready_marker(),
            &self.config.timeouts.element(),
        )
        .await
    }

    async fn populate(&self, session: &dyn BrowserSession, payload: &FormPayload) -> FormResult<()> {
        let element_wait = self.config.timeouts.element();
        let setter = FieldSetter::new(session, element_wait).with_binding(self.config.binding);
        let resolver = SelectResolver::new(session, element_wait).with_binding(self.config.binding);
        let registry = self.form.registry();
        let mut resolved: BTreeMap<&str, String> = BTreeMap::new();

        for field in registry.population_order() {
            let value = payload.get(field.name());
            if value.is_none() && skippable(field) {
                tracing::debug!(field = field.name(), "not in payload, skipped");
                continue;
            }
            let selector = registry
                .resolve_within(session, field.name(), &element_wait)
                .await?;
            let name = field.name();
            let written = match (field.kind(), value) {
                (FieldKind::Select, value) => {
                    let choice_text = value.map(FieldValue::as_text);
                    let choice = Choice::from_option(choice_text.as_deref());
                    resolver
                        .select(&selector, choice)
                        .await
                        .map_err(|e| e.in_field(name))?
                }
                (FieldKind::File, Some(value)) => {
                    let files = value
                        .files()
                        .map_or_else(|| vec![PathBuf::from(value.as_text())], <[_]>::to_vec);
                    setter
                        .attach_file(&selector, &files)
                        .await
                        .map_err(|e| e.in_field(name))?;
                    value.as_text()
                }
                (FieldKind::Radio, Some(value)) => {
                    let text = value.as_text();
                    setter
                        .check_radio(&selector, &text)
                        .await
                        .map_err(|e| e.in_field(name))?;
                    text
                }
                (FieldKind::Text | FieldKind::Textarea, Some(value)) => {
                    let text = field.normalize(&value.as_text());
                    setter
                        .set_value(&selector, &text)
                        .await
                        .map_err(|e| e.in_field(name))?;
                    text
                }
                (_, None) => continue,
            };
            tracing::info!(field = field.name(), kind = %field.kind(), %selector, "field populated");
            let _ = resolved.insert(field.name(), written);
        }

        for field in registry.required_fields() {
            if resolved.get(field.name()).map_or(true, |v| v.trim().is_empty()) {
                return Err(FormError::MissingRequiredField {
                    field: field.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Activate the submit control, returning the location it was activated from
    async fn submit(&self, session: &dyn BrowserSession) -> FormResult<String> {
        let origin = session.current_url().await?;
        activate(session, "form submit", self.form.submit_control()).await?;
        tracing::info!(url = %origin, "form submitted");
        Ok(origin)
    }
}

/// Selects are always resolved; other optional fields only when named
fn skippable(field: &FieldDescriptor) -> bool {
    field.kind() != FieldKind::Select
}

async fn step<T, F>(progress: &mut Progress, step: FlowStep, work: F) -> FormResult<T>
where
    F: Future<Output = FormResult<T>>,
{
    progress.step = step;
    let span = tracing::info_span!("flow_step", step = %step);
    let started = Instant::now();
    let result = work.instrument(span).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::info!(%step, elapsed_ms, "step complete"),
        Err(err) => tracing::warn!(%step, elapsed_ms, error = %err, "step failed"),
    }
    result
}

async fn await_element(
    session: &dyn BrowserSession,
    name: &str,
    selector: &Selector,
    wait: &WaitOptions,
) -> FormResult<()> {
    let found = wait_for(
        move || async move { Ok(element_exists(session, selector).await?.then_some(())) },
        wait,
        name,
    )
    .await;
    match found {
        Ok(_) => Ok(()),
        Err(err) if is_timeout(&err) => Err(FormError::LocatorNotFound {
            field: name.to_string(),
            selector: selector.to_string(),
        }),
        Err(err) => Err(err),
    }
}

/// Direct activation, bypassing pointer simulation
async fn activate(session: &dyn BrowserSession, name: &str, selector: &Selector) -> FormResult<()> {
    let found: bool = evaluate_as(session, &PageScript::Activate(selector.clone())).await?;
    if found {
        Ok(())
    } else {
        Err(FormError::LocatorNotFound {
            field: name.to_string(),
            selector: selector.to_string(),
        })
    }
}
