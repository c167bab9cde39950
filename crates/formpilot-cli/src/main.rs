//! Formpilot CLI: drive a listing-creation flow in a real browser
//!
//! ## Usage
//!
//! ```bash
//! formpilot run fixtures/create_listing_valid.json        # Run once
//! formpilot run fixture.json --report target/run.json     # Keep a JSON report
//! formpilot check-fixture fixtures/create_listing_valid.json
//! formpilot config -c formpilot.yaml                      # Show resolved settings
//! ```

use clap::Parser;
use formpilot_cli::{
    handlers, init_tracing, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity, config.log_format);

    match cli.command {
        Commands::Run(args) => handlers::run::execute_run(&config, &args),
        Commands::CheckFixture(args) => handlers::check::execute_check(&config, &args),
        Commands::Config(args) => handlers::config::execute_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(color)
        .with_log_format(cli.log_format.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use formpilot_cli::LogFormat;

    #[test]
    fn test_quiet_wins_over_verbose() {
        let cli = Cli::try_parse_from(["formpilot", "-q", "-vv", "config", "--defaults"]).unwrap();
        assert_eq!(build_config(&cli).verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::try_parse_from(["formpilot", "-v", "config"]).unwrap();
        assert_eq!(build_config(&cli).verbosity, Verbosity::Verbose);
        let cli = Cli::try_parse_from(["formpilot", "-vvv", "config"]).unwrap();
        assert_eq!(build_config(&cli).verbosity, Verbosity::Debug);
    }

    #[test]
    fn test_log_format_and_color() {
        let cli = Cli::try_parse_from([
            "formpilot",
            "--log-format",
            "json",
            "--color",
            "never",
            "config",
        ])
        .unwrap();
        let config = build_config(&cli);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.color, ColorChoice::Never);
    }
}
