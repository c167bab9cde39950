//! Console output of run and fixture results

use console::{style, Style, Term};
use formpilot::RunReport;

/// Writes styled status lines to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn line(&self, symbol: &str, plain: &str, color: Style, message: &str) {
        let prefix = if self.use_color {
            color.bold().apply_to(symbol).to_string()
        } else {
            plain.to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line("✓", "PASS", Style::new().green(), message);
        }
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line("✗", "FAIL", Style::new().red(), message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line("⚠", "WARN", Style::new().yellow(), message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line("ℹ", "INFO", Style::new().blue(), message);
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the outcome of a run
    pub fn run_summary(&self, report: &RunReport) {
        let seconds = report.duration_ms as f64 / 1000.0;
        if report.success {
            let title = report.title.as_deref().unwrap_or("listing");
            self.success(&format!("{title} created in {seconds:.2}s"));
        } else {
            let step = report
                .failed_step
                .map_or_else(|| "unknown".to_string(), |s| s.to_string());
            let kind = report.error_kind.as_deref().unwrap_or("Error");
            self.failure(&format!("failed at `{step}` after {seconds:.2}s ({kind})"));
            if let Some(ref error) = report.error {
                self.failure(error);
            }
        }
        if let Some(ref url) = report.final_url {
            self.info(&format!("final location: {url}"));
        }
        if let Some(ref text) = report.confirmation_text {
            self.info(&format!("last confirmation: {text}"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use formpilot::FlowStep;

    fn report(success: bool) -> RunReport {
        RunReport {
            run_id: "run-1".into(),
            success,
            failed_step: (!success).then_some(FlowStep::ResolveConfirmation),
            error_kind: (!success).then(|| "SubmissionNotConfirmed".to_string()),
            error: (!success).then(|| "Submission not confirmed after 45000ms".to_string()),
            final_url: Some("http://localhost:3000/create-listing".into()),
            confirmation_text: None,
            title: Some("Toyota Vios".into()),
            started_at: chrono::Utc::now(),
            duration_ms: 1500,
        }
    }

    #[test]
    fn test_new_reporter() {
        let reporter = Reporter::new(false, true);
        assert!(!reporter.use_color);
        assert!(reporter.quiet);
    }

    #[test]
    fn test_success_summary() {
        Reporter::new(false, false).run_summary(&report(true));
    }

    #[test]
    fn test_failure_summary_in_quiet_mode() {
        Reporter::new(true, true).run_summary(&report(false));
    }

    #[test]
    fn test_messages() {
        let reporter = Reporter::new(false, false);
        reporter.header("Fixture");
        reporter.warning("unknown field `colour`");
        reporter.info("7 fields");
    }
}
