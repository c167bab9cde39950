//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Formpilot: log in, fill and submit a listing form, then verify it
#[derive(Parser, Debug)]
#[command(name = "formpilot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the listing creation flow in a browser
    Run(RunArgs),

    /// Validate a payload fixture against the listing form
    CheckFixture(CheckFixtureArgs),

    /// Show the resolved runner configuration
    Config(ConfigArgs),
}

/// Settings layered over the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Runner configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base endpoint of the application
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Run the browser headless
    #[arg(long, env = "HEADLESS", value_parser = clap::builder::BoolishValueParser::new())]
    pub headless: Option<bool>,

    /// Path to the chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Payload fixture (JSON)
    pub fixture: PathBuf,

    /// Configuration overrides
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Login identifier
    #[arg(long, env = "TEST_EMAIL", default_value = "")]
    pub email: String,

    /// Login secret
    #[arg(long, env = "TEST_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// Suffix the title with a random id
    #[arg(long)]
    pub unique_title: bool,

    /// Write the JSON run report to this path
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

/// Arguments for the check-fixture command
#[derive(Parser, Debug)]
pub struct CheckFixtureArgs {
    /// Payload fixture (JSON)
    pub fixture: PathBuf,

    /// Print the resolved fields as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration overrides
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Ignore files and environment, print the built-in defaults
    #[arg(long)]
    pub defaults: bool,
}

/// Color choice argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_args() {
            let cli = Cli::try_parse_from([
                "formpilot",
                "run",
                "fixtures/create_listing_valid.json",
                "--base-url",
                "http://staging:8080",
                "--email",
                "seller@example.com",
                "--headless",
                "false",
                "--report",
                "target/formpilot/run.json",
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.overrides.base_url.as_deref(), Some("http://staging:8080"));
            assert_eq!(args.overrides.headless, Some(false));
            assert_eq!(args.email, "seller@example.com");
            assert!(args.report.is_some());
        }

        #[test]
        fn test_boolish_headless() {
            let cli =
                Cli::try_parse_from(["formpilot", "config", "--headless", "0"]).unwrap();
            let Commands::Config(args) = cli.command else {
                panic!("expected config");
            };
            assert_eq!(args.overrides.headless, Some(false));
        }

        #[test]
        fn test_global_flags() {
            let cli = Cli::try_parse_from([
                "formpilot",
                "check-fixture",
                "f.json",
                "-vv",
                "--log-format",
                "json",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.log_format, LogFormatArg::Json));
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["formpilot"]).is_err());
        }
    }
}
