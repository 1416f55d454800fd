// Error handling framework for uvcargo
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, UvCargoError>;

/// Main error type for uvcargo
///
/// Every variant is fatal: the pipeline never retries, it reports and exits.
#[derive(Debug, Error)]
pub enum UvCargoError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<ConfigError>),

    #[error("Process execution failed: {0}")]
    Process(#[from] Box<ProcessError>),

    #[error("Toolchain resolution failed: {0}")]
    Toolchain(#[from] Box<ToolchainError>),

    #[error("Config extraction failed: {0}")]
    Probe(#[from] Box<ProbeError>),

    #[error("Unsupported platform: {0}")]
    Platform(#[from] Box<PlatformError>),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Pin file and settings file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Version pin file not found: {path}")]
    PinFileMissing {
        path: PathBuf,
        suggestion: Option<String>,
    },

    #[error("Version pin file is empty: {path}")]
    PinFileEmpty { path: PathBuf },

    #[error("Settings file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid YAML syntax: {message}")]
    InvalidYaml {
        message: String,
        line: Option<u32>,
        column: Option<u32>,
        file_path: Option<PathBuf>,
    },

    #[error("Invalid configuration value for {field}: {message}")]
    InvalidValue {
        message: String,
        field: String,
        value: String,
        file_path: Option<PathBuf>,
    },
}

/// Subprocess errors
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Command not found: {command}")]
    CommandNotFound {
        command: String,
        suggestion: Option<String>,
    },

    #[error("Process spawn failed: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("Process execution failed: {command}")]
    ExecutionFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Process timeout after {duration:?}: {command}")]
    Timeout {
        command: String,
        duration: std::time::Duration,
    },

    #[error("Output capture failed: {message}")]
    OutputCaptureFailed { message: String, command: String },
}

/// Interpreter discovery errors
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("No installed toolchain matches version {version}")]
    NotFound {
        version: String,
        suggestion: Option<String>,
    },

    #[error("{} installed toolchains match version {version}", candidates.len())]
    Ambiguous {
        version: String,
        candidates: Vec<PathBuf>,
    },

    #[error("Cannot derive an install root from interpreter path: {path}")]
    InvalidInterpreterPath { path: PathBuf, reason: String },

    #[error("Invalid toolchain pattern for version {version}: {pattern}")]
    InvalidPattern {
        version: String,
        pattern: String,
        error: String,
    },
}

/// Probe transcript errors
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("marker not found in probe output: {marker:?}")]
    MarkerNotFound {
        marker: String,
        command: String,
        transcript_tail: String,
    },
}

/// Platform support errors
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("'{os}' has no known {capability}")]
    Unsupported { os: String, capability: String },

    #[error("Home directory could not be determined")]
    HomeDirectoryUnavailable,
}

/// Format errors with colors and context
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Format an error with context and colors
    pub fn format_error(&self, error: &UvCargoError) -> String {
        use tracing::error;

        let error_type = match error {
            UvCargoError::Config(_) => "config",
            UvCargoError::Process(_) => "process",
            UvCargoError::Toolchain(_) => "toolchain",
            UvCargoError::Probe(_) => "probe",
            UvCargoError::Platform(_) => "platform",
            UvCargoError::Io(_) => "io",
        };
        error!(error_type = error_type, error = %error, "uvcargo failed");

        let mut output = String::new();

        if self.use_colors {
            output.push_str("\x1b[31m");
        }
        output.push_str("Error: ");
        if self.use_colors {
            output.push_str("\x1b[0m");
        }

        output.push_str(&error.to_string());

        match error {
            UvCargoError::Config(config_err) => {
                self.add_config_context(&mut output, config_err.as_ref());
            }
            UvCargoError::Process(process_err) => {
                self.add_process_context(&mut output, process_err.as_ref());
            }
            UvCargoError::Toolchain(toolchain_err) => {
                self.add_toolchain_context(&mut output, toolchain_err.as_ref());
            }
            UvCargoError::Probe(probe_err) => {
                self.add_probe_context(&mut output, probe_err.as_ref());
            }
            UvCargoError::Platform(platform_err) => {
                if let PlatformError::Unsupported { .. } = platform_err.as_ref() {
                    output.push_str("\n  Help: supported platforms are linux and windows");
                }
            }
            UvCargoError::Io(_) => {}
        }

        output
    }

    fn add_config_context(&self, output: &mut String, error: &ConfigError) {
        match error {
            ConfigError::PinFileMissing {
                suggestion: Some(suggestion),
                ..
            } => {
                output.push_str(&format!("\n  Help: {suggestion}"));
            }
            ConfigError::PinFileEmpty { path } => {
                output.push_str(&format!(
                    "\n  Help: write a version such as 3.12 into {}",
                    path.display()
                ));
            }
            ConfigError::InvalidYaml {
                file_path: Some(path),
                line: Some(line),
                ..
            } => {
                output.push_str(&format!("\n  --> {}:{}", path.display(), line));
            }
            _ => {}
        }
    }

    fn add_process_context(&self, output: &mut String, error: &ProcessError) {
        match error {
            ProcessError::CommandNotFound {
                suggestion: Some(suggestion),
                ..
            } => {
                output.push_str(&format!("\n  Help: {suggestion}"));
            }
            ProcessError::SpawnFailed { error, .. } => {
                output.push_str(&format!("\n  Cause: {error}"));
            }
            ProcessError::ExecutionFailed { stderr, .. } if !stderr.is_empty() => {
                output.push_str(&format!("\n  Process error: {stderr}"));
            }
            _ => {}
        }
    }

    fn add_toolchain_context(&self, output: &mut String, error: &ToolchainError) {
        match error {
            ToolchainError::NotFound {
                suggestion: Some(suggestion),
                ..
            } => {
                output.push_str(&format!("\n  Help: {suggestion}"));
            }
            ToolchainError::Ambiguous { candidates, .. } => {
                for (i, candidate) in candidates.iter().enumerate() {
                    output.push_str(&format!("\n    {}: {}", i + 1, candidate.display()));
                }
                output.push_str("\n  Help: pin a more specific version or uninstall duplicates");
            }
            ToolchainError::InvalidInterpreterPath { reason, .. } => {
                output.push_str(&format!("\n  Cause: {reason}"));
            }
            ToolchainError::InvalidPattern { error, .. } => {
                output.push_str(&format!("\n  Cause: {error}"));
            }
            _ => {}
        }
    }

    fn add_probe_context(&self, output: &mut String, error: &ProbeError) {
        match error {
            ProbeError::MarkerNotFound {
                command,
                transcript_tail,
                ..
            } => {
                output.push_str(&format!("\n  Probe command: {command}"));
                if !transcript_tail.is_empty() {
                    output.push_str(&format!("\n  Probe output ended with:\n{transcript_tail}"));
                }
            }
        }
    }
}

/// Exit codes for failures raised before the build tool runs
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const PROCESS_ERROR: i32 = 3;
    pub const TOOLCHAIN_ERROR: i32 = 4;
    pub const PROBE_ERROR: i32 = 5;
    pub const PLATFORM_ERROR: i32 = 6;
    pub const TIMEOUT_ERROR: i32 = 7;
}

impl UvCargoError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            UvCargoError::Config(_) => exit_codes::CONFIG_ERROR,
            UvCargoError::Process(process_err) => match process_err.as_ref() {
                ProcessError::Timeout { .. } => exit_codes::TIMEOUT_ERROR,
                _ => exit_codes::PROCESS_ERROR,
            },
            UvCargoError::Toolchain(_) => exit_codes::TOOLCHAIN_ERROR,
            UvCargoError::Probe(_) => exit_codes::PROBE_ERROR,
            UvCargoError::Platform(_) => exit_codes::PLATFORM_ERROR,
            UvCargoError::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }

    /// Create a user-friendly error message with context
    pub fn user_message(&self, use_colors: bool) -> String {
        let formatter = ErrorFormatter::new(use_colors);
        formatter.format_error(self)
    }
}

impl From<ConfigError> for UvCargoError {
    fn from(error: ConfigError) -> Self {
        UvCargoError::Config(Box::new(error))
    }
}

impl From<ProcessError> for UvCargoError {
    fn from(error: ProcessError) -> Self {
        UvCargoError::Process(Box::new(error))
    }
}

impl From<ToolchainError> for UvCargoError {
    fn from(error: ToolchainError) -> Self {
        UvCargoError::Toolchain(Box::new(error))
    }
}

impl From<ProbeError> for UvCargoError {
    fn from(error: ProbeError) -> Self {
        UvCargoError::Probe(Box::new(error))
    }
}

impl From<PlatformError> for UvCargoError {
    fn from(error: PlatformError) -> Self {
        UvCargoError::Platform(Box::new(error))
    }
}

// Conversion from serde_yaml::Error to ConfigError
impl From<serde_yaml::Error> for Box<ConfigError> {
    fn from(error: serde_yaml::Error) -> Self {
        let location = error.location();
        Box::new(ConfigError::InvalidYaml {
            message: error.to_string(),
            line: location.as_ref().map(|l| l.line() as u32),
            column: location.as_ref().map(|l| l.column() as u32),
            file_path: None,
        })
    }
}
