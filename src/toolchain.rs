// Finding the uv-managed interpreter for the pinned version
//
// `uv python list` prints one toolchain per line: an identifier such as
// `cpython-3.12.6-linux-x86_64-gnu`, then either the interpreter path or a
// placeholder like `<download available>`.

use std::path::PathBuf;

use regex::Regex;

use crate::config::ToolchainManagerSettings;
use crate::error::{Result, ToolchainError};
use crate::process::{ProcessConfig, ProcessManager};
use crate::version::VersionPin;

/// Raw output of the toolchain manager's listing command
#[derive(Debug, Clone)]
pub struct ToolchainListing {
    pub text: String,
    pub exit_code: Option<i32>,
}

/// Source of toolchain listings
pub trait ToolchainLister {
    fn list(&self) -> Result<ToolchainListing>;
}

/// Lists toolchains by running `uv python list` (or the configured equivalent)
pub struct UvToolchainLister<'a> {
    settings: &'a ToolchainManagerSettings,
    manager: &'a ProcessManager,
}

impl<'a> UvToolchainLister<'a> {
    pub fn new(settings: &'a ToolchainManagerSettings, manager: &'a ProcessManager) -> Self {
        Self { settings, manager }
    }
}

impl ToolchainLister for UvToolchainLister<'_> {
    fn list(&self) -> Result<ToolchainListing> {
        let config = ProcessConfig::new(&self.settings.program)
            .with_args(self.settings.list_args.clone())
            .with_capture_output(true);

        let result = self.manager.execute(config)?;
        if !result.success() {
            // Not fatal: whatever was printed still gets matched
            tracing::warn!(
                program = %self.settings.program,
                exit_code = ?result.exit_code(),
                stderr = %result.stderr().trim(),
                "Toolchain listing exited unsuccessfully"
            );
        }

        Ok(ToolchainListing {
            text: result.stdout(),
            exit_code: result.exit_code(),
        })
    }
}

/// Paths of installed toolchains whose identifier carries `pin` followed by
/// a patch number, in listing order.
///
/// The pin must appear as a whole `-`-delimited segment (`-3.12.6-`), so
/// `3.1` never matches a `3.12` toolchain.
pub fn find_matching_toolchains(listing: &str, pin: &VersionPin) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        r"(?m)^(?P<id>\S+-{}\.\d+-\S+)[ \t]+(?P<path>\S+)",
        regex::escape(pin.as_str())
    );
    let re = Regex::new(&pattern).map_err(|e| ToolchainError::InvalidPattern {
        version: pin.to_string(),
        pattern: pattern.clone(),
        error: e.to_string(),
    })?;

    let matches = re
        .captures_iter(listing)
        .filter_map(|caps| {
            let id = caps.name("id")?.as_str();
            let path = caps.name("path")?.as_str();
            if !is_interpreter_path(path) {
                tracing::debug!(toolchain = %id, marker = %path, "Toolchain not installed");
                return None;
            }
            tracing::debug!(toolchain = %id, path = %path, "Toolchain matches pin");
            Some(PathBuf::from(path))
        })
        .collect();
    Ok(matches)
}

/// Placeholders are bracketed (`<download available>`); real entries are
/// paths with at least one separator.
fn is_interpreter_path(token: &str) -> bool {
    !token.starts_with('<') && token.contains(['/', '\\'])
}

/// The single interpreter matching `pin`; zero or several matches are errors
pub fn select_toolchain(listing: &str, pin: &VersionPin) -> Result<PathBuf> {
    let mut matches = find_matching_toolchains(listing, pin)?;
    match matches.len() {
        0 => Err(ToolchainError::NotFound {
            version: pin.to_string(),
            suggestion: Some(format!("Install it with `uv python install {pin}`")),
        }
        .into()),
        1 => Ok(matches.remove(0)),
        _ => Err(ToolchainError::Ambiguous {
            version: pin.to_string(),
            candidates: matches,
        }
        .into()),
    }
}

/// List installed toolchains and pick the one matching `pin`
pub fn resolve_interpreter(lister: &dyn ToolchainLister, pin: &VersionPin) -> Result<PathBuf> {
    let listing = lister.list()?;
    let interpreter = select_toolchain(&listing.text, pin)?;
    tracing::info!(version = %pin, interpreter = %interpreter.display(), "Resolved interpreter");
    Ok(interpreter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UvCargoError;

    const LINUX_LINE: &str = "cpython-3.12.6-linux-x86_64-gnu       /home/bob/.local/share/uv/python/cpython-3.12.6-linux-x86_64-gnu/bin/python3 -> python3.12";

    struct FixedLister(&'static str);

    impl ToolchainLister for FixedLister {
        fn list(&self) -> Result<ToolchainListing> {
            Ok(ToolchainListing {
                text: self.0.to_string(),
                exit_code: Some(0),
            })
        }
    }

    fn pin(v: &str) -> VersionPin {
        VersionPin::new(v)
    }

    #[test]
    fn test_linux_listing() {
        assert_eq!(
            find_matching_toolchains(LINUX_LINE, &pin("3.12")).unwrap(),
            vec![PathBuf::from(
                "/home/bob/.local/share/uv/python/cpython-3.12.6-linux-x86_64-gnu/bin/python3"
            )]
        );
    }

    #[test]
    fn test_linux_listing_no_path() {
        let listing = "cpython-3.12.6-linux-x86_64-gnu       <download available>";
        assert!(find_matching_toolchains(listing, &pin("3.12")).unwrap().is_empty());
    }

    #[test]
    fn test_windows_listing() {
        let listing = r"cpython-3.12.6-windows-x86_64-none       AppData\Roaming\uv\python\cpython-3.12.6-windows-x86_64-none\python.exe";
        assert_eq!(
            find_matching_toolchains(listing, &pin("3.12")).unwrap(),
            vec![PathBuf::from(
                r"AppData\Roaming\uv\python\cpython-3.12.6-windows-x86_64-none\python.exe"
            )]
        );
    }

    #[test]
    fn test_windows_listing_no_path() {
        let listing = "cpython-3.12.6-windows-x86_64-none       <download available>";
        assert!(find_matching_toolchains(listing, &pin("3.12")).unwrap().is_empty());
    }

    #[test]
    fn test_prefix_versions_do_not_collide() {
        let listing = "\
cpython-3.1.5-linux-x86_64-gnu     /opt/py31/bin/python3
cpython-3.12.6-linux-x86_64-gnu    /opt/py312/bin/python3
";
        assert_eq!(
            find_matching_toolchains(listing, &pin("3.1")).unwrap(),
            vec![PathBuf::from("/opt/py31/bin/python3")]
        );
        assert_eq!(
            find_matching_toolchains(listing, &pin("3.12")).unwrap(),
            vec![PathBuf::from("/opt/py312/bin/python3")]
        );
    }

    #[test]
    fn test_dot_in_pin_is_literal() {
        let listing = "cpython-3x12.6-linux-x86_64-gnu    /opt/odd/bin/python3";
        assert!(find_matching_toolchains(listing, &pin("3.12")).unwrap().is_empty());
    }

    #[test]
    fn test_pin_with_regex_metacharacters() {
        let listing = "cpython-3.12.6-linux-x86_64-gnu    /opt/py312/bin/python3";
        for odd in ["3.(12", "3.12+", "[3.12]", r"3\12"] {
            assert!(find_matching_toolchains(listing, &pin(odd)).unwrap().is_empty());
        }
        match select_toolchain(listing, &pin("3.(12")).unwrap_err() {
            UvCargoError::Toolchain(e) => assert!(matches!(*e, ToolchainError::NotFound { .. })),
            other => panic!("Expected toolchain error, got {other:?}"),
        }
    }

    #[test]
    fn test_match_is_line_anchored() {
        // Identifier alone on a line must not pair with the next line's token
        let listing = "cpython-3.12.6-linux-x86_64-gnu\n/opt/py312/bin/python3 something";
        assert!(find_matching_toolchains(listing, &pin("3.12")).unwrap().is_empty());

        let indented = "  cpython-3.12.6-linux-x86_64-gnu    /opt/py312/bin/python3";
        assert!(find_matching_toolchains(indented, &pin("3.12")).unwrap().is_empty());
    }

    #[test]
    fn test_crlf_listing() {
        let listing = "cpython-3.12.6-windows-x86_64-none   C:\\py\\python.exe\r\npypy-3.10.14-windows-x86_64-none   <download available>\r\n";
        assert_eq!(
            find_matching_toolchains(listing, &pin("3.12")).unwrap(),
            vec![PathBuf::from(r"C:\py\python.exe")]
        );
    }

    #[test]
    fn test_select_not_found() {
        let err = select_toolchain(LINUX_LINE, &pin("3.13")).unwrap_err();
        match err {
            UvCargoError::Toolchain(e) => match *e {
                ToolchainError::NotFound { version, .. } => assert_eq!(version, "3.13"),
                other => panic!("Expected NotFound, got {other:?}"),
            },
            other => panic!("Expected toolchain error, got {other:?}"),
        }
    }

    #[test]
    fn test_select_ambiguous() {
        let listing = "\
cpython-3.12.6-linux-x86_64-gnu    /opt/a/bin/python3
cpython-3.12.5-linux-x86_64-gnu    /opt/b/bin/python3
";
        let err = select_toolchain(listing, &pin("3.12")).unwrap_err();
        match err {
            UvCargoError::Toolchain(e) => match *e {
                ToolchainError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
                other => panic!("Expected Ambiguous, got {other:?}"),
            },
            other => panic!("Expected toolchain error, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_through_lister() {
        let interpreter = resolve_interpreter(&FixedLister(LINUX_LINE), &pin("3.12")).unwrap();
        assert!(interpreter.ends_with("bin/python3"));
    }
}
