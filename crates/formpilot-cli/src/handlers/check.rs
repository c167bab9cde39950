//! Check-fixture command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::CheckFixtureArgs;
use formpilot::pages::listing_form;
use formpilot::{FormPayload, PageObject};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// What a valid fixture resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    /// Field values as they will be written
    pub fields: BTreeMap<String, String>,
    /// Keys the listing form does not know
    pub unknown: Vec<String>,
}

/// Load `path` and validate it against the listing form
pub fn check_fixture(path: &Path) -> CliResult<FixtureSummary> {
    let payload = FormPayload::from_file(path)?;
    let form = listing_form();
    let registry = form.registry();
    payload
        .validate(registry)
        .map_err(|e| CliError::invalid_fixture(e.to_string()))?;

    let fields = payload
        .field_names()
        .map(|name| (name.to_string(), payload.text(name).unwrap_or_default()))
        .collect();
    let unknown = payload
        .field_names()
        .filter(|name| registry.descriptor(name).is_none())
        .map(ToString::to_string)
        .collect();
    Ok(FixtureSummary { fields, unknown })
}

/// Execute the check-fixture command
pub fn execute_check(config: &CliConfig, args: &CheckFixtureArgs) -> CliResult<()> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    let summary = match check_fixture(&args.fixture) {
        Ok(summary) => summary,
        Err(err) => {
            reporter.failure(&format!("{}: {err}", args.fixture.display()));
            return Err(err);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    reporter.header("Fixture");
    for (name, value) in &summary.fields {
        reporter.info(&format!("{name} = {value}"));
    }
    for name in &summary.unknown {
        reporter.warning(&format!("`{name}` is not a field of the listing form"));
    }
    reporter.success(&format!("{} is valid", args.fixture.display()));
    Ok(())
}
