// Reading the pinned interpreter version
use std::fmt;
use std::path::Path;

use crate::error::{ConfigError, Result, UvCargoError};

/// Default pin file, as written by `uv python pin`
pub const PIN_FILE: &str = ".python-version";

/// The interpreter version a project is pinned to, e.g. `3.12`.
///
/// Opaque: no validation happens here, a malformed pin simply matches no
/// installed toolchain later on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPin(String);

impl VersionPin {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the first line of `path`, without its line terminator
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UvCargoError::from(ConfigError::PinFileMissing {
                    path: path.to_path_buf(),
                    suggestion: Some(
                        "Run `uv python pin <version>` in the project root".to_string(),
                    ),
                })
            } else {
                UvCargoError::Io(e)
            }
        })?;

        let first_line = content.split('\n').next().unwrap_or_default();
        let version = first_line.strip_suffix('\r').unwrap_or(first_line);
        if version.is_empty() {
            return Err(ConfigError::PinFileEmpty {
                path: path.to_path_buf(),
            }
            .into());
        }

        tracing::debug!(path = %path.display(), version = %version, "Read version pin");
        Ok(Self::new(version))
    }
}

impl fmt::Display for VersionPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pin(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PIN_FILE);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_reads_pin_with_trailing_newline() {
        let (_dir, path) = write_pin("3.12\n");
        assert_eq!(VersionPin::from_file(&path).unwrap().as_str(), "3.12");
    }

    #[test]
    fn test_reads_pin_without_trailing_newline() {
        let (_dir, path) = write_pin("3.13");
        assert_eq!(VersionPin::from_file(&path).unwrap().as_str(), "3.13");
    }

    #[test]
    fn test_strips_crlf_terminator() {
        let (_dir, path) = write_pin("3.11\r\n");
        assert_eq!(VersionPin::from_file(&path).unwrap().as_str(), "3.11");
    }

    #[test]
    fn test_only_first_line_is_used() {
        let (_dir, path) = write_pin("3.12\n3.11\n");
        assert_eq!(VersionPin::from_file(&path).unwrap().as_str(), "3.12");
    }

    #[test]
    fn test_content_is_not_otherwise_modified() {
        let (_dir, path) = write_pin(" 3.12 \n");
        assert_eq!(VersionPin::from_file(&path).unwrap().as_str(), " 3.12 ");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = VersionPin::from_file(&dir.path().join(PIN_FILE)).unwrap_err();
        match err {
            UvCargoError::Config(e) => {
                assert!(matches!(*e, ConfigError::PinFileMissing { suggestion: Some(_), .. }))
            }
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_file() {
        let (_dir, path) = write_pin("");
        let err = VersionPin::from_file(&path).unwrap_err();
        match err {
            UvCargoError::Config(e) => assert!(matches!(*e, ConfigError::PinFileEmpty { .. })),
            other => panic!("Expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_first_line_counts_as_empty() {
        let (_dir, path) = write_pin("\n3.12\n");
        assert!(VersionPin::from_file(&path).is_err());
    }
}
