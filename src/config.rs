//! Importer configuration.
//!
//! Layered in this order, later layers appending to earlier ones:
//! built-in defaults, a YAML file, the `HDRLISP_LIBS` environment variable
//! and finally command-line flags.
//!
//! ```yaml
//! include_paths: ["include", "/opt/headers"]
//! lib_dirs: ["/usr/lib/erlang/lib"]
//! foreign_suffixes: ["hrl"]
//! max_include_depth: 16
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{ErrorKind, HdrError};

/// Environment variable listing extra library directories.
pub const LIBS_ENV: &str = "HDRLISP_LIBS";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hdrlisp.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for relative `include-file` targets.
    pub include_paths: Vec<PathBuf>,
    /// Directories holding `<lib>` or `<lib>-<version>` library roots.
    pub lib_dirs: Vec<PathBuf>,
    /// File extensions treated as foreign headers.
    pub foreign_suffixes: Vec<String>,
    /// Nesting limit for native files including other files.
    pub max_include_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            lib_dirs: Vec::new(),
            foreign_suffixes: vec!["hrl".to_string()],
            max_include_depth: 16,
        }
    }
}

impl Config {
    /// Loads the explicit file if given, otherwise `hdrlisp.yaml` from the
    /// current directory when present, otherwise the defaults. The
    /// environment layer is applied on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self, HdrError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, HdrError> {
        let content = fs::read_to_string(path).map_err(|e| config_error(path, e.to_string()))?;
        let config = Self::from_yaml(&content).map_err(|e| config_error(path, e.to_string()))?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Appends the directories named in `HDRLISP_LIBS`.
    pub fn apply_env(&mut self) {
        if let Some(value) = std::env::var_os(LIBS_ENV) {
            self.lib_dirs.extend(
                std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()),
            );
        }
    }

    /// Whether `path` names a foreign header.
    pub fn is_foreign(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.foreign_suffixes.iter().any(|s| s == ext))
    }
}

fn config_error(path: &Path, reason: String) -> HdrError {
    HdrError::bare(
        ErrorKind::ReadError {
            path: path.display().to_string(),
            reason,
        },
        "config",
    )
    .with_help("check the configuration file syntax")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.foreign_suffixes, vec!["hrl".to_string()]);
        assert_eq!(config.max_include_depth, 16);
        assert!(config.is_foreign(Path::new("a/b.hrl")));
        assert!(!config.is_foreign(Path::new("a/b.lisp")));
        assert!(!config.is_foreign(Path::new("hrl")));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("include_paths: [inc]\n").unwrap();
        assert_eq!(config.include_paths, vec![PathBuf::from("inc")]);
        assert_eq!(config.foreign_suffixes, vec!["hrl".to_string()]);
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_yaml_is_rejected() {
        assert!(Config::from_yaml("max_include_depth: [1, 2]").is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_file(Path::new("/no/such/hdrlisp.yaml")).unwrap_err();
        assert_eq!(err.diagnostic_info.error_code, "hdrlisp::config::read_error");
    }
}
