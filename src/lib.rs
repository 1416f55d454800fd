// uvcargo - build PyO3 extensions against the uv-managed Python pinned by a project

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod pyo3_config;
pub mod toolchain;
pub mod user_output;
pub mod version;

// Re-export main types for easier access
pub use config::{Settings, ToolchainManagerSettings};
pub use environment::{AssembledEnvironment, EnvironmentAssembler, ProcessEnvironment};
pub use error::{
    exit_codes, ConfigError, PlatformError, ProbeError, ProcessError, Result, ToolchainError,
    UvCargoError,
};
pub use launcher::{BuildLauncher, BuildToolLauncher};
pub use logging::{ColorConfig, LogConfig, LogFormat};
pub use pipeline::{BuildPipeline, Collaborators};
pub use platform::Platform;
pub use process::{ProcessConfig, ProcessManager, ProcessResult};
pub use pyo3_config::{BuildToolProbe, CacheOutcome, ConfigCache, ConfigProbe, ProbeTranscript};
pub use toolchain::{ToolchainLister, ToolchainListing, UvToolchainLister};
pub use version::VersionPin;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

// Build information (set by build script)
pub const BUILD_DATE: &str = env!("BUILD_DATE");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const RUST_VERSION: &str = env!("RUST_VERSION");

/// Get formatted version string with build information
pub fn version_info() -> String {
    format!("{NAME} {VERSION} (commit: {GIT_COMMIT}, built: {BUILD_DATE}, rustc: {RUST_VERSION})")
}
