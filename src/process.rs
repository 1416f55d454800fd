// Subprocess execution for the toolchain manager, the probe build and the
// final build tool invocation

use crate::error::{ProcessError, Result, UvCargoError};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Process execution configuration
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub command: String,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub timeout: Option<Duration>,
    pub capture_output: bool,
    pub inherit_env: bool,
}

impl ProcessConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            environment: HashMap::new(),
            timeout: None,
            capture_output: true,
            inherit_env: true,
        }
    }

    pub fn with_args(mut self, args: Vec<impl Into<OsString>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Variables layered over the inherited environment
    pub fn with_environment(mut self, env: HashMap<String, String>) -> Self {
        self.environment = env;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// When false the child shares this process's stdin, stdout and stderr
    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    pub fn with_inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Human-readable command line for messages
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Process execution result
#[derive(Debug)]
pub struct ProcessResult {
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status.code()
    }

    /// Exit code to hand back to our own caller. A child killed by a signal
    /// reports `128 + signal` as shells do.
    pub fn forwarded_exit_code(&self) -> i32 {
        if let Some(code) = self.exit_status.code() {
            return code;
        }
        #[cfg(unix)]
        if let Some(signal) = self.exit_status.signal() {
            return 128 + signal;
        }
        1
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Runs one subprocess at a time to completion
pub struct ProcessManager {
    default_timeout: Option<Duration>,
}

impl ProcessManager {
    /// A manager that waits on children indefinitely
    pub fn new() -> Self {
        Self {
            default_timeout: None,
        }
    }

    pub fn with_default_timeout(default_timeout: Duration) -> Self {
        Self {
            default_timeout: Some(default_timeout),
        }
    }

    // Synchronous execution
    pub fn execute(&self, config: ProcessConfig) -> Result<ProcessResult> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(UvCargoError::Io)?
            .block_on(self.execute_async(config))
    }

    pub async fn execute_async(&self, config: ProcessConfig) -> Result<ProcessResult> {
        use std::process::Stdio;
        use tokio::io::AsyncReadExt;
        use tokio::process::Command;

        let start_time = std::time::Instant::now();

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        if !config.inherit_env {
            cmd.env_clear();
        }
        for (key, value) in &config.environment {
            cmd.env(key, value);
        }

        if config.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
            cmd.stdin(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
            cmd.stdin(Stdio::inherit());
        }

        tracing::debug!(command = %config.display_command(), "Spawning process");

        let mut child = cmd.spawn().map_err(|e| spawn_error(&config.command, e))?;

        let command = config.command.clone();
        let capture = config.capture_output;
        let run = async move {
            let mut stdout_data = Vec::new();
            let mut stderr_data = Vec::new();

            if capture {
                // Drain both pipes together so a chatty child cannot block on a full one
                let mut stdout = child.stdout.take();
                let mut stderr = child.stderr.take();
                let read_stdout = async {
                    match stdout.as_mut() {
                        Some(pipe) => pipe.read_to_end(&mut stdout_data).await.map(|_| ()),
                        None => Ok(()),
                    }
                };
                let read_stderr = async {
                    match stderr.as_mut() {
                        Some(pipe) => pipe.read_to_end(&mut stderr_data).await.map(|_| ()),
                        None => Ok(()),
                    }
                };
                let (out_result, err_result) = tokio::join!(read_stdout, read_stderr);
                out_result.and(err_result).map_err(|e| {
                    UvCargoError::from(ProcessError::OutputCaptureFailed {
                        message: format!("Failed to read process output: {e}"),
                        command: command.clone(),
                    })
                })?;
            }

            let exit_status = child.wait().await.map_err(|e| {
                UvCargoError::from(ProcessError::ExecutionFailed {
                    command: command.clone(),
                    exit_code: None,
                    stderr: format!("Failed to wait for process: {e}"),
                })
            })?;

            Ok::<ProcessResult, UvCargoError>(ProcessResult {
                exit_status,
                stdout: stdout_data,
                stderr: stderr_data,
                duration: start_time.elapsed(),
            })
        };

        let result = match config.timeout.or(self.default_timeout) {
            // kill_on_drop is not set, so a timed out child is left to the OS
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                UvCargoError::from(ProcessError::Timeout {
                    command: config.command.clone(),
                    duration: limit,
                })
            })?,
            None => run.await,
        }?;

        tracing::debug!(
            command = %config.command,
            exit_code = ?result.exit_code(),
            duration_ms = result.duration.as_millis() as u64,
            "Process finished"
        );

        Ok(result)
    }
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_error(command: &str, error: std::io::Error) -> UvCargoError {
    if error.kind() == std::io::ErrorKind::NotFound && which::which(command).is_err() {
        return ProcessError::CommandNotFound {
            command: command.to_string(),
            suggestion: Some(format!("Make sure `{command}` is installed and on PATH")),
        }
        .into();
    }

    ProcessError::SpawnFailed {
        command: command.to_string(),
        error: error.to_string(),
    }
    .into()
}
