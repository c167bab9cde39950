//! Run reports.
//!
//! A [`RunReport`] is the single pass/fail record handed to whatever reports
//! on a run. On failure it carries the triggering step, the error and the
//! diagnostic location and confirmation text. The page source is left out.

use crate::flow::{FlowStep, StepFailure};
use crate::result::FormResult;
use crate::verify::RunOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Serializable outcome of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of the run
    pub run_id: String,
    /// Whether the run succeeded
    pub success: bool,
    /// Step that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<FlowStep>,
    /// Error kind (e.g. `NoOptionsAvailable`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final browsing location
    pub final_url: Option<String>,
    /// Last confirmation text observed
    pub confirmation_text: Option<String>,
    /// Title submitted
    pub title: Option<String>,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Build a report from a run result
    #[must_use]
    pub fn from_result(
        result: &Result<RunOutcome, StepFailure>,
        title: Option<String>,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let duration_ms = duration.as_millis() as u64;
        match result {
            Ok(outcome) => Self {
                run_id,
                success: outcome.success,
                failed_step: None,
                error_kind: None,
                error: None,
                final_url: Some(outcome.final_url.clone()),
                confirmation_text: outcome.confirmation_text.clone(),
                title,
                started_at,
                duration_ms,
            },
            Err(failure) => Self {
                run_id,
                success: false,
                failed_step: Some(failure.step),
                error_kind: Some(failure.error.kind().to_string()),
                error: Some(failure.error.to_string()),
                final_url: failure.snapshot.final_url.clone(),
                confirmation_text: failure.snapshot.confirmation_text.clone(),
                title,
                started_at,
                duration_ms,
            },
        }
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> FormResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON rendering to `path`
    pub fn write_json(&self, path: &Path) -> FormResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
