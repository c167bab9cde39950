//! CLI configuration
//!
//! The runner configuration is layered, lowest first: built-in defaults, an
//! optional YAML file, then flags and their environment fallbacks.
//! Credentials never appear in any of these files.

use crate::commands::ConfigOverrides;
use crate::error::CliResult;
use formpilot::{FlowConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log directive for this level
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().is_term(),
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Presentation settings of one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log line format
    pub log_format: LogFormat,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set log format
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

/// Everything a run needs apart from the payload and credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Flow settings: endpoint, paths, timeouts, binding
    pub flow: FlowConfig,
    /// Browser settings
    pub browser: SessionConfig,
}

impl RunnerConfig {
    /// Parse a YAML document; an empty document yields the defaults
    pub fn from_yaml_str(yaml: &str) -> CliResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load from `path`, or the defaults when none is given
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)?;
                let config = Self::from_yaml_str(&yaml)?;
                tracing::debug!(path = %path.display(), "runner configuration loaded");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply flag and environment overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(ref url) = overrides.base_url {
            self.flow.base_url.clone_from(url);
        }
        if let Some(headless) = overrides.headless {
            self.browser.headless = headless;
        }
        if let Some(ref path) = overrides.chromium_path {
            self.browser.chromium_path = Some(path.clone());
        }
        if overrides.no_sandbox {
            self.browser.sandbox = false;
        }
        self
    }

    /// Load the file named by `overrides` and apply the rest of them
    pub fn resolve(overrides: &ConfigOverrides) -> CliResult<Self> {
        Ok(Self::load(overrides.config.as_deref())?.with_overrides(overrides))
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> CliResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
