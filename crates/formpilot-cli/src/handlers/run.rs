//! Run command handler

use crate::config::{CliConfig, RunnerConfig};
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::RunArgs;
use chrono::Utc;
use formpilot::{
    run_scoped, BrowserSession, Credentials, FlowRunner, FormPayload, RunOutcome, RunReport,
    StepFailure,
};
use std::time::Instant;

/// Run the flow once against `session`, closing it afterwards
pub async fn run_with_session<S: BrowserSession + 'static>(
    runner: FlowRunner,
    session: S,
    payload: FormPayload,
    credentials: Credentials,
) -> Result<RunOutcome, StepFailure> {
    run_scoped(session, move |s| {
        Box::pin(async move { runner.run(s, &payload, &credentials).await })
    })
    .await
}

#[cfg(feature = "browser")]
async fn run_in_browser(
    config: RunnerConfig,
    payload: FormPayload,
    credentials: Credentials,
) -> CliResult<Result<RunOutcome, StepFailure>> {
    let session = formpilot::ChromiumSession::launch(config.browser).await?;
    let runner = FlowRunner::new(config.flow);
    Ok(run_with_session(runner, session, payload, credentials).await)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn run_in_browser(
    _config: RunnerConfig,
    _payload: FormPayload,
    _credentials: Credentials,
) -> CliResult<Result<RunOutcome, StepFailure>> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}

/// Execute the run command
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let runner_config = RunnerConfig::resolve(&args.overrides)?;

    let mut payload = FormPayload::from_file(&args.fixture)?;
    if args.unique_title {
        payload = payload.with_unique_title();
    }
    let title = payload.title();
    let credentials = Credentials::new(&args.email, &args.password);

    if config.verbosity.is_verbose() {
        reporter.info(&format!("target: {}", runner_config.flow.base_url));
    }
    tracing::info!(
        fixture = %args.fixture.display(),
        base_url = %runner_config.flow.base_url,
        headless = runner_config.browser.headless,
        "starting run"
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create runtime: {e}")))?;

    let started_at = Utc::now();
    let started = Instant::now();
    let result = rt.block_on(run_in_browser(runner_config, payload, credentials))?;

    let report = RunReport::from_result(&result, title, started_at, started.elapsed());
    reporter.run_summary(&report);
    if let Some(ref path) = args.report {
        report.write_json(path)?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    result.map(|_| ()).map_err(CliError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use formpilot::mock::{MockElement, ScriptedSession};
    use formpilot::{FlowConfig, FlowStep, FormError, Selector, Timeouts};

    fn payload(dir: &tempfile::TempDir) -> FormPayload {
        let image = dir.path().join("car1.jpg");
        std::fs::write(&image, b"\xFF\xD8\xFF").unwrap();
        FormPayload::new()
            .with_text("title", "Toyota Vios")
            .with_text("description", "Xe đẹp")
            .with_number("year", 2020)
            .with_number("mileage", 45_000)
            .with_number("price", 520)
            .with_attachment(image)
    }

    #[tokio::test]
    async fn test_blank_credentials_close_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let session = ScriptedSession::new()
            .with_element(Selector::button("Đăng Nhập / Đăng ký"), MockElement::button());
        let observer = session.clone();
        let runner = FlowRunner::new(FlowConfig::new().with_timeouts(Timeouts::uniform(200, 5)));

        let failure = run_with_session(runner, session, payload(&dir), Credentials::new("", ""))
            .await
            .unwrap_err();

        assert_eq!(failure.step, FlowStep::Authenticate);
        assert!(matches!(failure.error, FormError::AuthenticationFailed { .. }));
        assert!(observer.is_closed());
    }

    #[test]
    fn test_failed_run_report_converts() {
        let failure = StepFailure {
            step: FlowStep::Authenticate,
            error: FormError::AuthenticationFailed {
                reason: "identifier or secret is empty".into(),
            },
            snapshot: formpilot::DiagnosticSnapshot::default(),
        };
        let result: Result<RunOutcome, StepFailure> = Err(failure);
        let report = RunReport::from_result(&result, None, Utc::now(), std::time::Duration::ZERO);
        assert_eq!(report.failed_step, Some(FlowStep::Authenticate));
        let err = result.map(|_| ()).map_err(CliError::from).unwrap_err();
        assert!(err.to_string().contains("authenticate"));
    }
}
