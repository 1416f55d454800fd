// The uvcargo pipeline: pin -> interpreter -> library dirs -> cached PyO3
// config -> build environment -> build tool

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::environment::{EnvironmentAssembler, ProcessEnvironment, CONFIG_FILE_VAR};
use crate::error::{PlatformError, Result};
use crate::launcher::{BuildLauncher, BuildToolLauncher};
use crate::platform::Platform;
use crate::process::ProcessManager;
use crate::pyo3_config::{BuildToolProbe, ConfigCache, ConfigProbe};
use crate::toolchain::{resolve_interpreter, ToolchainLister, UvToolchainLister};
use crate::user_output::UserOutput;
use crate::version::VersionPin;

/// External collaborators of a pipeline run
pub struct Collaborators<'a> {
    pub lister: &'a dyn ToolchainLister,
    pub probe: &'a dyn ConfigProbe,
    pub launcher: &'a dyn BuildLauncher,
}

/// One invocation of uvcargo for a project directory
pub struct BuildPipeline {
    settings: Settings,
    project_dir: PathBuf,
    platform: Platform,
    home: PathBuf,
    output: UserOutput,
}

impl BuildPipeline {
    pub fn new(
        settings: Settings,
        project_dir: impl Into<PathBuf>,
        platform: Platform,
        home: impl Into<PathBuf>,
        output: UserOutput,
    ) -> Self {
        Self {
            settings,
            project_dir: project_dir.into(),
            platform,
            home: home.into(),
            output,
        }
    }

    /// Pipeline for the current directory, platform and user
    pub fn for_current_dir(output: UserOutput) -> Result<Self> {
        let project_dir = std::env::current_dir()?;
        let settings = Settings::load(&project_dir)?;
        let platform = Platform::current()?;
        let home = dirs::home_dir().ok_or(PlatformError::HomeDirectoryUnavailable)?;
        Ok(Self::new(settings, project_dir, platform, home, output))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> PathBuf {
        self.settings.config_path(&self.project_dir)
    }

    /// Run with the real toolchain manager, probe build and build tool
    pub fn run(&self, args: &[OsString]) -> Result<i32> {
        let manager = ProcessManager::new();
        let lister = UvToolchainLister::new(&self.settings.toolchain_manager, &manager);
        let probe = BuildToolProbe::new(&self.settings.build_tool, &manager)
            .with_working_dir(self.project_dir.clone());
        let launcher = BuildToolLauncher::new(&self.settings.build_tool, &manager);

        self.run_with(
            Collaborators {
                lister: &lister,
                probe: &probe,
                launcher: &launcher,
            },
            &ProcessEnvironment::inherit_system(),
            args,
        )
    }

    /// Run against explicit collaborators and base environment
    pub fn run_with(
        &self,
        collaborators: Collaborators<'_>,
        base_env: &ProcessEnvironment,
        args: &[OsString],
    ) -> Result<i32> {
        let span = tracing::info_span!("uvcargo", project = %self.project_dir.display());
        let _guard = span.enter();

        let pin = VersionPin::from_file(&self.settings.pin_path(&self.project_dir))?;
        let interpreter = resolve_interpreter(collaborators.lister, &pin)?;

        let lib_dir = self
            .platform
            .primary_library_dir(&interpreter, &self.home)?;
        let cache = ConfigCache::new(self.config_path());
        let outcome = cache.ensure(collaborators.probe, base_env, &lib_dir)?;
        self.output.show_config_cache(outcome, cache.path());

        let env = self.build_environment(base_env, &interpreter, cache.path())?;

        collaborators.launcher.launch(args, &env)
    }

    fn build_environment(
        &self,
        base_env: &ProcessEnvironment,
        interpreter: &Path,
        config_path: &Path,
    ) -> Result<ProcessEnvironment> {
        let assembled = EnvironmentAssembler::new(self.platform, &self.home).assemble(
            base_env,
            interpreter,
            config_path,
        )?;

        self.output
            .show_env_set(CONFIG_FILE_VAR, &config_path.to_string_lossy());
        self.output
            .show_env_addition(&assembled.added_paths, assembled.loader_var);

        Ok(assembled.environment)
    }
}
