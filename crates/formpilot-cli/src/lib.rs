//! Formpilot CLI library
//!
//! Command-line front end for the Formpilot form automation core: resolves
//! the layered runner configuration, validates fixtures and drives one
//! listing-creation run in a chromium session.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    CheckFixtureArgs, Cli, ColorArg, Commands, ConfigArgs, ConfigOverrides, LogFormatArg, RunArgs,
};
pub use config::{CliConfig, ColorChoice, LogFormat, RunnerConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_tracing;
pub use output::Reporter;
