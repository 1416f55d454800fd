// Running the real build tool
use std::ffi::OsString;

use crate::environment::ProcessEnvironment;
use crate::error::Result;
use crate::process::{ProcessConfig, ProcessManager};

/// Final consumer of the assembled environment
pub trait BuildLauncher {
    /// Run the build with `args` under `env` and return its exit code
    fn launch(&self, args: &[OsString], env: &ProcessEnvironment) -> Result<i32>;
}

/// Runs the build tool with inherited stdio, blocking until it exits
pub struct BuildToolLauncher<'a> {
    program: String,
    manager: &'a ProcessManager,
}

impl<'a> BuildToolLauncher<'a> {
    pub fn new(program: impl Into<String>, manager: &'a ProcessManager) -> Self {
        Self {
            program: program.into(),
            manager,
        }
    }
}

impl BuildLauncher for BuildToolLauncher<'_> {
    fn launch(&self, args: &[OsString], env: &ProcessEnvironment) -> Result<i32> {
        let config = ProcessConfig::new(&self.program)
            .with_args(args.to_vec())
            .with_environment(env.to_map())
            .with_capture_output(false);

        tracing::info!(command = %config.display_command(), "Launching build");
        let result = self.manager.execute(config)?;
        Ok(result.forwarded_exit_code())
    }
}
