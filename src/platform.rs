// Supported host platforms and their library layout rules
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{PlatformError, Result, ToolchainError};

/// Host operating systems uvcargo knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
}

/// Derives the library directories for an interpreter executable.
/// The second argument is the user's home directory.
type LibraryLayout = fn(&str, &Path) -> Result<Vec<PathBuf>>;

/// Per-platform behavior table
#[derive(Clone, Copy)]
pub struct PlatformSpec {
    pub platform: Platform,
    /// Value of `std::env::consts::OS` for this platform
    pub os: &'static str,
    /// Variable the dynamic loader consults for extra library directories
    pub loader_var: &'static str,
    pub path_separator: char,
    /// Environment variable names compare case-insensitively (`Path` is `PATH`)
    pub case_insensitive_env: bool,
    pub library_layout: Option<LibraryLayout>,
}

const PLATFORMS: &[PlatformSpec] = &[
    PlatformSpec {
        platform: Platform::Linux,
        os: "linux",
        loader_var: "LD_LIBRARY_PATH",
        path_separator: ':',
        case_insensitive_env: false,
        library_layout: Some(linux_library_dirs as LibraryLayout),
    },
    PlatformSpec {
        platform: Platform::Windows,
        os: "windows",
        loader_var: "PATH",
        path_separator: ';',
        case_insensitive_env: true,
        library_layout: Some(windows_library_dirs as LibraryLayout),
    },
    // No layout for uv-managed interpreters has been worked out on macOS yet
    PlatformSpec {
        platform: Platform::MacOs,
        os: "macos",
        loader_var: "DYLD_FALLBACK_LIBRARY_PATH",
        path_separator: ':',
        case_insensitive_env: false,
        library_layout: None,
    },
];

impl Platform {
    /// Platform of the running process
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Look up a platform by its `std::env::consts::OS` identifier
    pub fn from_os(os: &str) -> Result<Self> {
        PLATFORMS
            .iter()
            .find(|spec| spec.os == os)
            .map(|spec| spec.platform)
            .ok_or_else(|| {
                PlatformError::Unsupported {
                    os: os.to_string(),
                    capability: "loader search-path variable".to_string(),
                }
                .into()
            })
    }

    pub fn spec(self) -> &'static PlatformSpec {
        // Table rows are in enum declaration order
        &PLATFORMS[self as usize]
    }

    pub fn loader_var(self) -> &'static str {
        self.spec().loader_var
    }

    pub fn path_separator(self) -> char {
        self.spec().path_separator
    }

    /// Directories holding the interpreter's shared runtime library, primary first
    pub fn library_dirs(self, executable: &Path, home: &Path) -> Result<Vec<PathBuf>> {
        let spec = self.spec();
        let layout = spec.library_layout.ok_or_else(|| PlatformError::Unsupported {
            os: spec.os.to_string(),
            capability: "interpreter library layout".to_string(),
        })?;

        let dirs = layout(&executable.to_string_lossy(), home)?;
        tracing::debug!(
            platform = %self,
            executable = %executable.display(),
            dirs = ?dirs,
            "Resolved interpreter library directories"
        );
        Ok(dirs)
    }

    /// The single directory recorded as `lib_dir` in the generated config
    pub fn primary_library_dir(self, executable: &Path, home: &Path) -> Result<PathBuf> {
        let mut dirs = self.library_dirs(executable, home)?;
        Ok(dirs.remove(0))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().os)
    }
}

// Paths are handled as text so that a listing from one platform can be
// resolved on another, which keeps the derivation testable everywhere.
fn parent_of<'a>(path: &'a str, separators: &[char]) -> Option<&'a str> {
    let trimmed = path.trim_end_matches(separators);
    let (parent, name) = trimmed.rsplit_once(separators)?;
    if name.is_empty() {
        return None;
    }
    if parent.is_empty() {
        // Parent of "/python3" is the root itself
        return Some(&trimmed[..1]);
    }
    Some(parent)
}

fn invalid_interpreter(executable: &str, reason: &str) -> crate::error::UvCargoError {
    ToolchainError::InvalidInterpreterPath {
        path: PathBuf::from(executable),
        reason: reason.to_string(),
    }
    .into()
}

/// `<root>/bin/python3` -> `<root>/lib`
fn linux_library_dirs(executable: &str, _home: &Path) -> Result<Vec<PathBuf>> {
    let bin_dir = parent_of(executable, &['/'])
        .ok_or_else(|| invalid_interpreter(executable, "executable has no parent directory"))?;
    let install_root = parent_of(bin_dir, &['/'])
        .ok_or_else(|| invalid_interpreter(executable, "bin directory has no parent directory"))?;

    let install_root = install_root.trim_end_matches('/');
    Ok(vec![PathBuf::from(format!("{install_root}/lib"))])
}

/// `<home>\<install>\python.exe` -> `<home>\<install>\libs`, `<home>\<install>`
fn windows_library_dirs(executable: &str, home: &Path) -> Result<Vec<PathBuf>> {
    const SEPARATORS: &[char] = &['\\', '/'];

    let install_dir = parent_of(executable, SEPARATORS)
        .ok_or_else(|| invalid_interpreter(executable, "executable has no parent directory"))?;

    // uv lists Windows interpreters relative to the home directory; an
    // absolute parent replaces the home prefix, as a path join would
    let is_absolute = install_dir.starts_with(SEPARATORS)
        || install_dir.as_bytes().get(1) == Some(&b':');
    let install_dir = if is_absolute {
        install_dir.to_string()
    } else {
        let home = home.to_string_lossy();
        format!("{}\\{}", home.trim_end_matches(SEPARATORS), install_dir)
    };

    let libs = format!("{install_dir}\\libs");
    Ok(vec![PathBuf::from(libs), PathBuf::from(install_dir)])
}
