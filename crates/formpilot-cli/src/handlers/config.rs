//! Config command handler

use crate::config::RunnerConfig;
use crate::error::CliResult;
use crate::ConfigArgs;

/// Resolve the runner configuration for `args`
pub fn resolve_config(args: &ConfigArgs) -> CliResult<RunnerConfig> {
    if args.defaults {
        Ok(RunnerConfig::default())
    } else {
        RunnerConfig::resolve(&args.overrides)
    }
}

/// Execute the config command
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    let config = resolve_config(args)?;
    print!("{}", config.to_yaml()?);
    Ok(())
}
