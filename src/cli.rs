// CLI interface for uvcargo using clap
use clap::Parser;
use std::ffi::OsString;

use crate::error::Result;
use crate::pipeline::BuildPipeline;
use crate::user_output::{UserOutput, UserOutputConfig};

/// Every argument is forwarded to the build tool, so clap's own help and
/// version flags are disabled: `uvcargo --help` shows cargo's help.
#[derive(Parser, Debug)]
#[command(
    name = "uvcargo",
    about = "Run cargo against the uv-managed Python pinned in .python-version",
    version = crate::VERSION,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Arguments passed unchanged to the build tool
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Parse the process arguments, keeping every argument after the program
    /// name exactly as given. clap treats a leading `--` as its own
    /// separator, so the forwarded vector is taken from the raw input.
    pub fn parse_forwarded<I, T>(raw: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let raw: Vec<OsString> = raw.into_iter().map(Into::into).collect();
        let mut cli = Self::parse_from(&raw);
        cli.args = raw.into_iter().skip(1).collect();
        cli
    }

    /// -v/--verbose anywhere in the arguments; the flag is still forwarded
    pub fn verbose(&self) -> bool {
        self.args.iter().any(|a| a == "-v" || a == "--verbose")
    }

    pub fn run(&self) -> Result<i32> {
        self.init_logging();
        tracing::debug!(version = %crate::version_info(), "Starting uvcargo");

        let output = UserOutput::new(UserOutputConfig::new(self.verbose()));
        let pipeline = BuildPipeline::for_current_dir(output)?;
        pipeline.run(&self.args)
    }

    fn init_logging(&self) {
        use crate::logging::{init_logging, LogConfig};

        let log_config = LogConfig::from_cli(self.verbose());

        if let Err(e) = init_logging(log_config) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }
}
