//! Include target resolution.
//!
//! Turns the argument of an `include-file` or `include-lib` directive into an
//! existing path and decides whether it is native source or a foreign header.

use log::{debug, trace};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::ast::{AstNode, Expr};
use crate::config::Config;
use crate::errors::{ErrorKind, HdrError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Native,
    Foreign,
}

/// Installation roots of libraries named by `include-lib`.
pub trait LibraryRoots {
    fn lib_root(&self, lib: &str) -> Option<PathBuf>;
}

impl<F> LibraryRoots for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn lib_root(&self, lib: &str) -> Option<PathBuf> {
        self(lib)
    }
}

/// Library lookup over a list of directories, each holding `<lib>` or
/// `<lib>-<version>` subdirectories. The highest version wins.
#[derive(Debug, Clone, Default)]
pub struct LibDirs {
    dirs: Vec<PathBuf>,
}

impl LibDirs {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.lib_dirs.clone())
    }
}

impl LibraryRoots for LibDirs {
    fn lib_root(&self, lib: &str) -> Option<PathBuf> {
        let mut best: Option<(Vec<u64>, PathBuf)> = None;
        for dir in &self.dirs {
            let entries = WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_dir());
            for entry in entries {
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                let Some(version) = lib_version(name, lib) else {
                    continue;
                };
                trace!("library candidate {}", entry.path().display());
                if best.as_ref().map_or(true, |(v, _)| version > *v) {
                    best = Some((version, entry.path().to_path_buf()));
                }
            }
        }
        best.map(|(_, path)| path)
    }
}

/// Version of a `<lib>` or `<lib>-<version>` directory name, empty for the
/// unversioned form.
fn lib_version(dir_name: &str, lib: &str) -> Option<Vec<u64>> {
    if dir_name == lib {
        return Some(Vec::new());
    }
    let version = dir_name.strip_prefix(lib)?.strip_prefix('-')?;
    if version.is_empty() {
        return None;
    }
    Some(
        version
            .split(|c: char| c == '.' || c == '-')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect(),
    )
}

// ============================================================================
// RESOLUTION
// ============================================================================

pub fn classify(path: &Path, config: &Config) -> SourceKind {
    if config.is_foreign(path) {
        SourceKind::Foreign
    } else {
        SourceKind::Native
    }
}

/// The single string argument of an include directive.
pub fn directive_target(directive: &str, args: &[AstNode]) -> Result<String, HdrError> {
    match args {
        [arg] => match &*arg.value {
            Expr::String(target) => Ok(target.clone()),
            other => Err(bad_argument(format!(
                "({} ...) expects a string, found {}",
                directive,
                other.pretty()
            ))),
        },
        _ => Err(bad_argument(format!(
            "({} ...) takes exactly one argument, found {}",
            directive,
            args.len()
        ))),
    }
}

/// Resolves an `include-file` target: absolute paths as given, relative ones
/// against the including file's directory, the configured include paths and
/// the working directory, in that order.
pub fn resolve_file(
    target: &str,
    base_dir: Option<&Path>,
    config: &Config,
) -> Result<PathBuf, HdrError> {
    let path = Path::new(target);
    if path.is_absolute() {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(not_found(target));
    }

    let candidates = base_dir
        .map(Path::to_path_buf)
        .into_iter()
        .chain(config.include_paths.iter().cloned())
        .chain(std::iter::once(PathBuf::from(".")));
    for dir in candidates {
        let candidate = dir.join(path);
        trace!("trying {}", candidate.display());
        if candidate.is_file() {
            debug!("resolved {} to {}", target, candidate.display());
            return Ok(candidate);
        }
    }
    Err(not_found(target))
}

/// Resolves an `include-lib` target: as a direct path first, then by the
/// library root of its first segment.
pub fn resolve_lib(
    target: &str,
    base_dir: Option<&Path>,
    config: &Config,
    roots: &dyn LibraryRoots,
) -> Result<PathBuf, HdrError> {
    if let Ok(direct) = resolve_file(target, base_dir, config) {
        return Ok(direct);
    }

    let mut components = Path::new(target).components();
    let lib = match components.next() {
        Some(Component::Normal(segment)) => segment.to_string_lossy().into_owned(),
        _ => {
            return Err(bad_argument(format!(
                "library include `{}` must start with a library name",
                target
            )))
        }
    };
    let rest = components.as_path();

    let Some(root) = roots.lib_root(&lib) else {
        return Err(bad_argument(format!("unknown library `{}` in `{}`", lib, target)));
    };
    let path = root.join(rest);
    debug!("library {} rooted at {}", lib, root.display());
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found(&path.display().to_string()))
    }
}

fn bad_argument(message: String) -> HdrError {
    HdrError::bare(ErrorKind::BadArgument { message }, "include")
}

fn not_found(target: &str) -> HdrError {
    HdrError::bare(
        ErrorKind::ReadError {
            path: target.to_string(),
            reason: "file not found".to_string(),
        },
        "include",
    )
}
