// Optional project settings for uvcargo
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result, UvCargoError};
use crate::version::PIN_FILE;

/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = ".uvcargo.yaml";

/// Default location of the generated PyO3 config, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pyo3_config";

/// Project settings. Every field has a default, so the settings file is
/// optional and may list only what differs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// File holding the pinned interpreter version
    pub pin_file: PathBuf,
    /// Where the generated PyO3 config is cached
    pub config_file: PathBuf,
    pub toolchain_manager: ToolchainManagerSettings,
    /// Build tool receiving the forwarded arguments
    pub build_tool: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainManagerSettings {
    pub program: String,
    pub list_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pin_file: PathBuf::from(PIN_FILE),
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            toolchain_manager: ToolchainManagerSettings::default(),
            build_tool: "cargo".to_string(),
        }
    }
}

impl Default for ToolchainManagerSettings {
    fn default() -> Self {
        Self {
            program: "uv".to_string(),
            list_args: vec!["python".to_string(), "list".to_string()],
        }
    }
}

impl Settings {
    /// Load `.uvcargo.yaml` from `dir`, falling back to defaults when absent
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if path.is_file() {
            let _span = tracing::debug_span!("settings_loading", path = %path.display()).entered();
            Self::from_file(&path)
        } else {
            tracing::debug!(dir = %dir.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(UvCargoError::Io)?;
        Self::from_yaml_with_context(&content, Some(path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with_context(yaml, None)
    }

    fn from_yaml_with_context(yaml: &str, file_path: Option<&Path>) -> Result<Self> {
        // An empty file deserializes as null rather than an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings = serde_yaml::from_str(yaml).map_err(|e| {
            let mut config_error = *Box::<ConfigError>::from(e);
            if let ConfigError::InvalidYaml {
                file_path: ref mut location,
                ..
            } = config_error
            {
                *location = file_path.map(Path::to_path_buf);
            }
            UvCargoError::Config(Box::new(config_error))
        })?;

        settings.validate(file_path)?;
        Ok(settings)
    }

    fn validate(&self, file_path: Option<&Path>) -> Result<()> {
        let invalid = |field: &str, value: String, message: &str| -> UvCargoError {
            ConfigError::InvalidValue {
                message: message.to_string(),
                field: field.to_string(),
                value,
                file_path: file_path.map(Path::to_path_buf),
            }
            .into()
        };

        if self.build_tool.trim().is_empty() {
            return Err(invalid(
                "build_tool",
                self.build_tool.clone(),
                "program name must not be empty",
            ));
        }
        if self.toolchain_manager.program.trim().is_empty() {
            return Err(invalid(
                "toolchain_manager.program",
                self.toolchain_manager.program.clone(),
                "program name must not be empty",
            ));
        }
        if self.pin_file.as_os_str().is_empty() {
            return Err(invalid("pin_file", String::new(), "path must not be empty"));
        }
        if self.config_file.as_os_str().is_empty() {
            return Err(invalid("config_file", String::new(), "path must not be empty"));
        }

        Ok(())
    }

    /// Pin file location for a project rooted at `dir`
    pub fn pin_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.pin_file)
    }

    /// Absolute location of the generated config for a project rooted at `dir`
    pub fn config_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.config_file)
    }
}
