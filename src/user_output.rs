// Progress messages shown with -v/--verbose
//
// These go to stdout, separate from tracing diagnostics on stderr, so the
// build tool's own output stays readable.

use std::io::{self, IsTerminal};
use std::path::Path;

use crate::pyo3_config::CacheOutcome;

#[derive(Debug, Clone)]
pub struct UserOutputConfig {
    pub verbose: bool,
    pub use_colors: bool,
}

impl UserOutputConfig {
    pub fn new(verbose: bool) -> Self {
        let use_colors = io::stdout().is_terminal()
            && std::env::var("TERM").map_or(true, |term| term != "dumb")
            && std::env::var("NO_COLOR").is_err();

        Self {
            verbose,
            use_colors,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Colors {
    pub green: &'static str,
    pub yellow: &'static str,
    pub reset: &'static str,
}

impl Colors {
    pub fn new(use_colors: bool) -> Self {
        if use_colors {
            Self {
                green: "\x1b[32m",
                yellow: "\x1b[33m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                green: "",
                yellow: "",
                reset: "",
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserOutput {
    config: UserOutputConfig,
    colors: Colors,
}

impl UserOutput {
    pub fn new(config: UserOutputConfig) -> Self {
        let colors = Colors::new(config.use_colors);
        Self { config, colors }
    }

    pub fn show_config_cache(&self, outcome: CacheOutcome, path: &Path) {
        if let Some(line) = self.format_config_cache(outcome, path) {
            println!("{line}");
        }
    }

    pub fn show_env_addition(&self, paths: &str, var: &str) {
        if let Some(line) = self.format_env_addition(paths, var) {
            println!("{line}");
        }
    }

    pub fn show_env_set(&self, var: &str, value: &str) {
        if let Some(line) = self.format_env_set(var, value) {
            println!("{line}");
        }
    }

    fn format_config_cache(&self, outcome: CacheOutcome, path: &Path) -> Option<String> {
        if !self.config.verbose {
            return None;
        }
        Some(match outcome {
            CacheOutcome::Written => format!(
                "{}Wrote{} pyo3 config to {}",
                self.colors.green,
                self.colors.reset,
                path.display()
            ),
            CacheOutcome::Present => format!(
                "{} already exists, {}skipping{} write of pyo3 config",
                path.display(),
                self.colors.yellow,
                self.colors.reset
            ),
        })
    }

    fn format_env_addition(&self, paths: &str, var: &str) -> Option<String> {
        self.config.verbose.then(|| {
            format!(
                "{}Adding{} {paths} to {var}",
                self.colors.green, self.colors.reset
            )
        })
    }

    fn format_env_set(&self, var: &str, value: &str) -> Option<String> {
        self.config.verbose.then(|| {
            format!(
                "{}Setting{} {var}={value}",
                self.colors.green, self.colors.reset
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(verbose: bool) -> UserOutput {
        UserOutput::new(UserOutputConfig {
            verbose,
            use_colors: false,
        })
    }

    #[test]
    fn test_quiet_unless_verbose() {
        let out = output(false);
        assert!(out
            .format_config_cache(CacheOutcome::Written, Path::new("/w/pyo3_config"))
            .is_none());
        assert!(out.format_env_addition("/a", "LD_LIBRARY_PATH").is_none());
        assert!(out.format_env_set("PYO3_CONFIG_FILE", "/w").is_none());
    }

    #[test]
    fn test_cache_messages() {
        let out = output(true);
        assert_eq!(
            out.format_config_cache(CacheOutcome::Written, Path::new("/w/pyo3_config"))
                .unwrap(),
            "Wrote pyo3 config to /w/pyo3_config"
        );
        assert_eq!(
            out.format_config_cache(CacheOutcome::Present, Path::new("/w/pyo3_config"))
                .unwrap(),
            "/w/pyo3_config already exists, skipping write of pyo3 config"
        );
    }

    #[test]
    fn test_env_addition_message() {
        assert_eq!(
            output(true)
                .format_env_addition("/opt/py/lib", "LD_LIBRARY_PATH")
                .unwrap(),
            "Adding /opt/py/lib to LD_LIBRARY_PATH"
        );
    }

    #[test]
    fn test_colored_message() {
        let out = UserOutput::new(UserOutputConfig {
            verbose: true,
            use_colors: true,
        });
        let line = out.format_env_set("PYO3_CONFIG_FILE", "/w/pyo3_config").unwrap();
        assert_eq!(line, "\x1b[32mSetting\x1b[0m PYO3_CONFIG_FILE=/w/pyo3_config");
    }
}
