// Generating and caching the PyO3 build config
//
// PyO3's build script prints its resolved interpreter config to stderr and
// aborts the build when PYO3_PRINT_CONFIG=1 is set. That transcript is the
// source for the cached config file; only `lib_dir` is rewritten so the
// linker finds the uv-managed interpreter instead of a system one.

use std::path::{Path, PathBuf};

use crate::environment::ProcessEnvironment;
use crate::error::{ProbeError, Result};
use crate::process::{ProcessConfig, ProcessManager};

/// Variable that makes PyO3 print its config and halt
pub const PRINT_CONFIG_VAR: &str = "PYO3_PRINT_CONFIG";

/// Line printed by PyO3 right before the config block
pub const TRANSCRIPT_START_MARKER: &str =
    "  -- PYO3_PRINT_CONFIG=1 is set, printing configuration and halting compile --\n";

/// Line printed by PyO3 right after the config block
pub const TRANSCRIPT_END_MARKER: &str = "note: unset the PYO3_PRINT_CONFIG environment variable and retry to compile with the above config";

/// Config key owned by uvcargo
pub const LIB_DIR_KEY: &str = "lib_dir";

/// Runs a build that prints PyO3's config, returning its diagnostic output
pub trait ConfigProbe {
    fn probe(&self, env: &ProcessEnvironment) -> Result<ProbeTranscript>;
}

/// Diagnostic output captured from a probe build
#[derive(Debug, Clone)]
pub struct ProbeTranscript {
    pub text: String,
    /// Probe command, for error messages
    pub command: String,
}

impl ProbeTranscript {
    pub fn new(text: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            command: command.into(),
        }
    }

    /// The config block between the start and end markers. A missing end
    /// marker means the block runs to the end of the transcript.
    pub fn config_block(&self) -> Result<&str> {
        let start = self
            .text
            .find(TRANSCRIPT_START_MARKER)
            .ok_or_else(|| ProbeError::MarkerNotFound {
                marker: TRANSCRIPT_START_MARKER.trim().to_string(),
                command: self.command.clone(),
                transcript_tail: self.tail(10),
            })?
            + TRANSCRIPT_START_MARKER.len();

        let rest = &self.text[start..];
        let block = match rest.find(TRANSCRIPT_END_MARKER) {
            Some(end) => &rest[..end],
            None => {
                tracing::warn!(
                    marker = TRANSCRIPT_END_MARKER,
                    "End marker missing from probe output, using the remainder"
                );
                rest
            }
        };
        Ok(block)
    }

    fn tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.text.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Rebuild a config block with `lib_dir` pointing at `lib_dir`.
///
/// Lines are trimmed, blank lines dropped and all other keys kept verbatim.
pub fn rewrite_config(block: &str, lib_dir: &Path) -> String {
    let lib_dir = lib_dir.to_string_lossy();
    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if is_lib_dir_line(line) {
                format!("{LIB_DIR_KEY}={lib_dir}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_lib_dir_line(line: &str) -> bool {
    line.split_once('=')
        .is_some_and(|(key, _)| key == LIB_DIR_KEY)
}

/// Probe that runs the build tool with `PYO3_PRINT_CONFIG=1`
pub struct BuildToolProbe<'a> {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    manager: &'a ProcessManager,
}

impl<'a> BuildToolProbe<'a> {
    /// Probe with `<program> build`
    pub fn new(program: impl Into<String>, manager: &'a ProcessManager) -> Self {
        Self {
            program: program.into(),
            args: vec!["build".to_string()],
            working_dir: None,
            manager,
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
}

impl ConfigProbe for BuildToolProbe<'_> {
    fn probe(&self, env: &ProcessEnvironment) -> Result<ProbeTranscript> {
        let probe_env = env.with_var(PRINT_CONFIG_VAR, "1");
        let mut config = ProcessConfig::new(&self.program)
            .with_args(self.args.clone())
            .with_environment(probe_env.to_map())
            .with_capture_output(true);
        if let Some(dir) = &self.working_dir {
            config = config.with_working_dir(dir.clone());
        }

        let command = config.display_command();
        tracing::debug!(command = %command, "Running PyO3 config probe");

        // The probe is expected to fail: PyO3 halts the build on purpose
        let result = self.manager.execute(config)?;
        Ok(ProbeTranscript::new(result.stderr(), command))
    }
}

/// What `ConfigCache::ensure` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The file was already present and left alone
    Present,
    /// The file was generated by a probe build
    Written,
}

/// The cached PyO3 config file.
///
/// Presence is the only freshness check: a stale or truncated file is used
/// as-is until someone deletes it.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    path: PathBuf,
}

impl ConfigCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the config file exists, probing at most once to create it
    pub fn ensure(
        &self,
        probe: &dyn ConfigProbe,
        env: &ProcessEnvironment,
        lib_dir: &Path,
    ) -> Result<CacheOutcome> {
        if self.path.exists() {
            tracing::debug!(path = %self.path.display(), "PyO3 config already cached");
            return Ok(CacheOutcome::Present);
        }

        let transcript = probe.probe(env)?;
        let config = rewrite_config(transcript.config_block()?, lib_dir);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, config)?;

        tracing::info!(
            path = %self.path.display(),
            lib_dir = %lib_dir.display(),
            "Wrote PyO3 config"
        );
        Ok(CacheOutcome::Written)
    }
}
