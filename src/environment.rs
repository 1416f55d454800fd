// Child-process environment for the build tool

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::platform::Platform;

/// Variable pointing PyO3 at the generated config file
pub const CONFIG_FILE_VAR: &str = "PYO3_CONFIG_FILE";

/// An immutable set of environment variables.
///
/// Every modifier returns a new value; the receiver is never changed, so a
/// base environment can be shared between the probe and the real build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessEnvironment {
    vars: BTreeMap<String, String>,
}

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of this process's environment
    pub fn inherit_system() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build from raw OS pairs. Pairs that are not valid Unicode are skipped
    /// with a warning; the child still inherits them, but a skipped variable
    /// that uvcargo sets (such as the loader path) is replaced, not extended.
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = vars
            .into_iter()
            .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (Ok(k), Err(_)) => {
                    tracing::warn!(
                        variable = %k,
                        "Ignoring environment variable with a non-UTF-8 value"
                    );
                    None
                }
                (Err(k), _) => {
                    tracing::warn!(
                        variable = %k.to_string_lossy(),
                        "Ignoring environment variable with a non-UTF-8 name"
                    );
                    None
                }
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Spelling of `key` already present in this environment, ignoring ASCII
    /// case. An exact match wins over other spellings.
    pub fn existing_key_ignore_case(&self, key: &str) -> Option<&str> {
        if let Some((existing, _)) = self.vars.get_key_value(key) {
            return Some(existing);
        }
        self.vars
            .keys()
            .find(|existing| existing.eq_ignore_ascii_case(key))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Copy with `key` set to `value`, replacing any previous value
    pub fn with_var(&self, key: &str, value: impl Into<String>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.to_string(), value.into());
        Self { vars }
    }

    /// Copy with `addition` appended to the path list in `key`.
    ///
    /// An existing non-empty value keeps its entries and gains `separator`
    /// before the addition (unless it already ends with one); an absent or
    /// empty value is replaced by the addition alone.
    pub fn with_appended_path_list(&self, key: &str, addition: &str, separator: char) -> Self {
        let value = match self.get(key) {
            Some(existing) if !existing.is_empty() => {
                if existing.ends_with(separator) {
                    format!("{existing}{addition}")
                } else {
                    format!("{existing}{separator}{addition}")
                }
            }
            _ => addition.to_string(),
        };
        self.with_var(key, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Map form accepted by `ProcessConfig::with_environment`
    pub fn to_map(&self) -> HashMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl FromIterator<(String, String)> for ProcessEnvironment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Result of layering the build variables over a base environment
#[derive(Debug, Clone)]
pub struct AssembledEnvironment {
    pub environment: ProcessEnvironment,
    /// Loader variable that received the library directories
    pub loader_var: &'static str,
    /// Separator-joined library directories that were added
    pub added_paths: String,
}

/// Builds the environment the build tool runs under
#[derive(Debug, Clone)]
pub struct EnvironmentAssembler {
    platform: Platform,
    home: PathBuf,
}

impl EnvironmentAssembler {
    pub fn new(platform: Platform, home: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            home: home.into(),
        }
    }

    /// Copy `base`, point `PYO3_CONFIG_FILE` at `config_path` and append the
    /// interpreter's library directories to the platform loader variable.
    pub fn assemble(
        &self,
        base: &ProcessEnvironment,
        interpreter: &Path,
        config_path: &Path,
    ) -> Result<AssembledEnvironment> {
        let spec = self.platform.spec();
        let library_dirs = self.platform.library_dirs(interpreter, &self.home)?;

        let added_paths = library_dirs
            .iter()
            .map(|dir| dir.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(&spec.path_separator.to_string());

        // Windows folds `Path` and `PATH` together in the child, so the
        // existing spelling must be updated rather than shadowed
        let key_for = |name: &'static str| -> String {
            if spec.case_insensitive_env {
                base.existing_key_ignore_case(name).unwrap_or(name).to_string()
            } else {
                name.to_string()
            }
        };
        let config_key = key_for(CONFIG_FILE_VAR);
        let loader_key = key_for(spec.loader_var);

        let environment = base
            .with_var(&config_key, config_path.to_string_lossy())
            .with_appended_path_list(&loader_key, &added_paths, spec.path_separator);

        tracing::debug!(
            loader_var = %loader_key,
            added = %added_paths,
            config_file = %config_path.display(),
            "Assembled build environment"
        );

        Ok(AssembledEnvironment {
            environment,
            loader_var: spec.loader_var,
            added_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env(pairs: &[(&str, &str)]) -> ProcessEnvironment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_with_var_leaves_original_untouched() {
        let base = base_env(&[("HOME", "/home/bob")]);
        let updated = base.with_var("PYO3_CONFIG_FILE", "/work/pyo3_config");

        assert_eq!(base.len(), 1);
        assert!(!base.contains("PYO3_CONFIG_FILE"));
        assert_eq!(updated.get("PYO3_CONFIG_FILE"), Some("/work/pyo3_config"));
        assert_eq!(updated.get("HOME"), Some("/home/bob"));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_os_vars_skips_non_utf8_values() {
        use std::os::unix::ffi::OsStringExt;

        let env = ProcessEnvironment::from_os_vars(vec![
            (OsString::from("HOME"), OsString::from("/home/bob")),
            (
                OsString::from("LD_LIBRARY_PATH"),
                OsString::from_vec(b"/opt/\xffbad".to_vec()),
            ),
            (OsString::from_vec(b"BAD\xfe".to_vec()), OsString::from("x")),
        ]);

        assert_eq!(env.len(), 1);
        assert_eq!(env.get("HOME"), Some("/home/bob"));
        assert!(!env.contains("LD_LIBRARY_PATH"));
    }

    #[test]
    fn test_append_inserts_separator() {
        let base = base_env(&[("LD_LIBRARY_PATH", "/usr/local/lib")]);
        let updated = base.with_appended_path_list("LD_LIBRARY_PATH", "/opt/py/lib", ':');
        assert_eq!(
            updated.get("LD_LIBRARY_PATH"),
            Some("/usr/local/lib:/opt/py/lib")
        );
    }

    #[test]
    fn test_append_does_not_double_trailing_separator() {
        let base = base_env(&[("PATH", r"C:\Windows;")]);
        let updated = base.with_appended_path_list("PATH", r"C:\py\libs", ';');
        assert_eq!(updated.get("PATH"), Some(r"C:\Windows;C:\py\libs"));
    }

    #[test]
    fn test_append_to_absent_or_empty_value() {
        let absent = ProcessEnvironment::new().with_appended_path_list("LD_LIBRARY_PATH", "/a", ':');
        assert_eq!(absent.get("LD_LIBRARY_PATH"), Some("/a"));

        let empty = base_env(&[("LD_LIBRARY_PATH", "")]).with_appended_path_list(
            "LD_LIBRARY_PATH",
            "/a",
            ':',
        );
        assert_eq!(empty.get("LD_LIBRARY_PATH"), Some("/a"));
    }

    #[test]
    fn test_to_map_round_trips_all_entries() {
        let env = base_env(&[("A", "1"), ("B", "2")]);
        let map = env.to_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn test_assemble_linux() {
        let assembler = EnvironmentAssembler::new(Platform::Linux, "/home/bob");
        let base = base_env(&[
            ("PYO3_CONFIG_FILE", "/stale"),
            ("LD_LIBRARY_PATH", "/usr/lib"),
        ]);

        let assembled = assembler
            .assemble(
                &base,
                Path::new("/home/bob/.local/share/uv/python/cpython-3.12.6/bin/python3"),
                Path::new("/work/pyo3_config"),
            )
            .unwrap();

        let env = &assembled.environment;
        assert_eq!(env.get("PYO3_CONFIG_FILE"), Some("/work/pyo3_config"));
        assert_eq!(
            env.get("LD_LIBRARY_PATH"),
            Some("/usr/lib:/home/bob/.local/share/uv/python/cpython-3.12.6/lib")
        );
        assert_eq!(assembled.loader_var, "LD_LIBRARY_PATH");

        // base is unchanged
        assert_eq!(base.get("PYO3_CONFIG_FILE"), Some("/stale"));
        assert_eq!(base.get("LD_LIBRARY_PATH"), Some("/usr/lib"));
    }

    #[test]
    fn test_assemble_windows_adds_both_directories() {
        let assembler = EnvironmentAssembler::new(Platform::Windows, r"C:\Users\bob");
        let base = base_env(&[("PATH", r"C:\Windows")]);

        let assembled = assembler
            .assemble(
                &base,
                Path::new(r"AppData\Roaming\uv\python\cpython-3.12.6\python.exe"),
                Path::new(r"C:\work\pyo3_config"),
            )
            .unwrap();

        assert_eq!(
            assembled.added_paths,
            r"C:\Users\bob\AppData\Roaming\uv\python\cpython-3.12.6\libs;C:\Users\bob\AppData\Roaming\uv\python\cpython-3.12.6"
        );
        assert_eq!(
            assembled.environment.get("PATH"),
            Some(
                r"C:\Windows;C:\Users\bob\AppData\Roaming\uv\python\cpython-3.12.6\libs;C:\Users\bob\AppData\Roaming\uv\python\cpython-3.12.6"
            )
        );
    }

    #[test]
    fn test_existing_key_ignore_case() {
        let env = base_env(&[("Path", r"C:\Windows"), ("HOME", "/home/bob")]);
        assert_eq!(env.existing_key_ignore_case("PATH"), Some("Path"));
        assert_eq!(env.existing_key_ignore_case("path"), Some("Path"));
        assert_eq!(env.existing_key_ignore_case("LD_LIBRARY_PATH"), None);

        let both = base_env(&[("Path", "a"), ("PATH", "b")]);
        assert_eq!(both.existing_key_ignore_case("PATH"), Some("PATH"));
    }

    #[test]
    fn test_assemble_windows_appends_to_mixed_case_path() {
        let assembler = EnvironmentAssembler::new(Platform::Windows, r"C:\Users\bob");
        let base = base_env(&[
            ("Path", r"C:\Windows;C:\Users\bob\.cargo\bin"),
            ("Pyo3_Config_File", r"C:\stale"),
        ]);

        let assembled = assembler
            .assemble(
                &base,
                Path::new(r"AppData\py\python.exe"),
                Path::new(r"C:\work\pyo3_config"),
            )
            .unwrap();

        let env = &assembled.environment;
        assert_eq!(
            env.get("Path"),
            Some(r"C:\Windows;C:\Users\bob\.cargo\bin;C:\Users\bob\AppData\py\libs;C:\Users\bob\AppData\py")
        );
        assert_eq!(env.get("Pyo3_Config_File"), Some(r"C:\work\pyo3_config"));
        assert!(!env.contains("PATH"));
        assert!(!env.contains("PYO3_CONFIG_FILE"));
        let keys: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Path", "Pyo3_Config_File"]);
    }

    #[test]
    fn test_assemble_linux_keeps_case_distinct() {
        let assembler = EnvironmentAssembler::new(Platform::Linux, "/home/bob");
        let base = base_env(&[("ld_library_path", "/lower")]);

        let assembled = assembler
            .assemble(
                &base,
                Path::new("/x/y/bin/python3"),
                Path::new("/work/pyo3_config"),
            )
            .unwrap();

        let env = &assembled.environment;
        assert_eq!(env.get("ld_library_path"), Some("/lower"));
        assert_eq!(env.get("LD_LIBRARY_PATH"), Some("/x/y/lib"));
    }

    #[test]
    fn test_assemble_unsupported_platform() {
        let assembler = EnvironmentAssembler::new(Platform::MacOs, "/Users/bob");
        let result = assembler.assemble(
            &ProcessEnvironment::new(),
            Path::new("/x/y/bin/python3"),
            Path::new("/work/pyo3_config"),
        );
        assert!(matches!(
            result,
            Err(crate::error::UvCargoError::Platform(_))
        ));
    }
}
