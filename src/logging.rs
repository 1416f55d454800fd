// Diagnostic logging for uvcargo
use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::Result;

/// Overrides the level computed from the command line, e.g. `UVCARGO_LOG=debug`
pub const LOG_ENV_VAR: &str = "UVCARGO_LOG";

/// Selects the diagnostic format: `compact` (default), `pretty` or `json`
pub const LOG_FORMAT_ENV_VAR: &str = "UVCARGO_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub color: ColorConfig,
    /// Raw `EnvFilter` directives taking precedence over `level`
    pub filter_override: Option<String>,
    pub show_targets: bool,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!(
                "unknown log format '{other}' (expected compact, pretty or json)"
            )),
        }
    }
}

/// Color output configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConfig {
    Auto,
    Always,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            color: ColorConfig::Auto,
            filter_override: None,
            show_targets: false,
        }
    }
}

impl LogConfig {
    /// Configuration for a run; `verbose` comes from -v/--verbose in the
    /// forwarded arguments
    pub fn from_cli(verbose: bool) -> Self {
        Self::from_env_values(
            verbose,
            std::env::var(LOG_ENV_VAR).ok(),
            std::env::var(LOG_FORMAT_ENV_VAR).ok(),
        )
    }

    /// `filter` and `format` are the raw `UVCARGO_LOG` and
    /// `UVCARGO_LOG_FORMAT` values
    pub fn from_env_values(verbose: bool, filter: Option<String>, format: Option<String>) -> Self {
        let filter_override = filter.filter(|value| !value.trim().is_empty());

        let format = match format.as_deref().map(str::trim) {
            None | Some("") => LogFormat::Compact,
            Some(value) => value.parse().unwrap_or_else(|e| {
                eprintln!("Ignoring {LOG_FORMAT_ENV_VAR}: {e}");
                LogFormat::Compact
            }),
        };

        Self {
            level: if verbose { Level::INFO } else { Level::WARN },
            format,
            filter_override,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Check if colors should be used based on configuration and terminal
    pub fn should_use_colors(&self) -> bool {
        match self.color {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                io::stderr().is_terminal()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
                    && std::env::var("NO_COLOR").is_err()
            }
        }
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.filter_override {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
                eprintln!("Ignoring invalid {LOG_ENV_VAR} value '{directives}': {e}");
                EnvFilter::new(format!("uvcargo={}", self.level))
            }),
            None => EnvFilter::new(format!("uvcargo={}", self.level)),
        }
    }
}

/// Install the global subscriber. Diagnostics go to stderr so stdout only
/// carries progress messages and the build tool's output.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = config.env_filter();
    let ansi = config.should_use_colors();

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_target(config.show_targets)
        .without_time();

    // A second initialisation (tests, embedding) keeps the first subscriber
    let installed = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if let Err(e) = installed {
        tracing::debug!(error = %e, "Logging already initialised");
    }

    Ok(())
}
