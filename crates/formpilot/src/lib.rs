//! Formpilot: end-to-end automation of framework-rendered web forms
//!
//! Formpilot logs into a web application, fills a multi-field form whose
//! controls are rendered and bound asynchronously, submits it, and verifies
//! the result. Every synchronization point is a bounded poll; nothing waits
//! on a fixed sleep.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         FlowRunner                               │
//! │  authenticate ─► open form ─► populate ─► submit ─► verify       │
//! ├──────────────┬──────────────┬──────────────┬─────────────────────┤
//! │ LocatorReg.  │ FieldSetter  │ SelectResolv │ ConfirmationRace    │
//! │ (strategies) │ (set+settle) │ (cascades)   │ OutcomeVerifier     │
//! ├──────────────┴──────────────┴──────────────┴─────────────────────┤
//! │             BrowserSession (chromium / scripted)                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod dialog;
mod driver;
mod field;
mod fixture;
mod flow;
mod locator;
mod page_object;
mod payload;
mod report;
mod result;
mod script;
mod select;
mod verify;
mod wait;

/// Browser control over CDP
pub mod browser;

/// Scripted in-memory session for tests and dry runs
pub mod mock;

/// Page objects of the listing application
pub mod pages;

pub use browser::{SessionConfig, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
#[cfg(feature = "browser")]
pub use browser::ChromiumSession;
pub use dialog::{Confirmation, ConfirmationRace, Dialog, DialogType, RaceState};
pub use driver::{
    element_exists, evaluate_as, read_select, read_value, BrowserSession, SelectOption,
    SelectSnapshot,
};
pub use field::FieldSetter;
pub use fixture::{run_scoped, ScopedFuture, SessionGuard};
pub use flow::{
    DiagnosticSnapshot, FlowConfig, FlowRunner, FlowStep, StepFailure, Timeouts,
    DEFAULT_CONFIRMATION_RETRIES, DEFAULT_DIALOG_TIMEOUT_MS,
};
pub use locator::{js_string, xpath_literal, ControlTag, Selector};
pub use page_object::{FieldDescriptor, FieldKind, FormPage, LocatorRegistry, PageObject};
pub use payload::{Credentials, FieldValue, FormPayload};
pub use report::RunReport;
pub use result::{FormError, FormResult};
pub use script::{BindingMode, PageScript};
pub use select::{CascadeSelection, Choice, SelectPhase, SelectResolver};
pub use verify::{OutcomeVerifier, RunOutcome, UrlPattern};
pub use wait::{
    is_timeout, wait_for, wait_until, Deadline, WaitOptions, WaitResult,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::browser::ChromiumSession;
    pub use super::browser::SessionConfig;
    pub use super::dialog::{Confirmation, Dialog};
    pub use super::driver::BrowserSession;
    pub use super::fixture::run_scoped;
    pub use super::flow::{FlowConfig, FlowRunner, FlowStep, StepFailure, Timeouts};
    pub use super::locator::Selector;
    pub use super::page_object::{FieldDescriptor, FieldKind, LocatorRegistry, PageObject};
    pub use super::payload::{Credentials, FormPayload};
    pub use super::report::RunReport;
    pub use super::result::{FormError, FormResult};
    pub use super::script::BindingMode;
    pub use super::verify::{OutcomeVerifier, RunOutcome, UrlPattern};
}
