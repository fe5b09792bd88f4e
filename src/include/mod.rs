//! The include expander.
//!
//! `(include-file "path")` and `(include-lib "lib/path")` directives are
//! replaced by a single `(progn ...)` form. Foreign headers contribute
//! `defrecord` forms followed by `defmacro` forms; native files contribute
//! their own forms, with nested directives expanded in turn.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::ast::AstNode;
use crate::config::Config;
use crate::errors::{ErrorKind, HdrError};
use crate::foreign::{HeaderPreprocessor, Preprocessor};

pub mod assemble;
pub mod loader;
pub mod macros;
pub mod records;
pub mod resolver;

pub use resolver::{LibDirs, LibraryRoots, SourceKind};

// ============================================================================
// STATE AND RESULTS
// ============================================================================

/// Caller state threaded through every include.
///
/// The expander only appends: each included path to `included`, each
/// definition-level diagnostic to `warnings`.
#[derive(Debug, Default)]
pub struct ExpandState {
    pub included: Vec<PathBuf>,
    pub warnings: Vec<HdrError>,
    /// File whose forms are being expanded; relative targets are looked up
    /// next to it first.
    pub current_file: Option<PathBuf>,
    depth: usize,
}

/// Where an [`ExpandState`] stood before an include began.
#[derive(Debug)]
struct StateMark {
    included: usize,
    warnings: usize,
    current_file: Option<PathBuf>,
    depth: usize,
}

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self {
            current_file: Some(path.into()),
            ..Self::default()
        }
    }

    fn mark(&self) -> StateMark {
        StateMark {
            included: self.included.len(),
            warnings: self.warnings.len(),
            current_file: self.current_file.clone(),
            depth: self.depth,
        }
    }
}

/// A directive's replacement form together with the updated state.
#[derive(Debug)]
pub struct Expanded {
    pub form: AstNode,
    pub state: ExpandState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    IncludeFile,
    IncludeLib,
}

impl Directive {
    pub fn from_symbol(name: &str) -> Option<Self> {
        match name {
            "include-file" => Some(Directive::IncludeFile),
            "include-lib" => Some(Directive::IncludeLib),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Directive::IncludeFile => "include-file",
            Directive::IncludeLib => "include-lib",
        }
    }

    /// Splits `(include-file ...)` into the directive and its arguments.
    pub fn parse(form: &AstNode) -> Option<(Directive, &[AstNode])> {
        let items = form.value.as_list()?;
        let directive = Self::from_symbol(items.first()?.value.as_symbol()?)?;
        Some((directive, &items[1..]))
    }
}

// ============================================================================
// EXPANDER
// ============================================================================

pub struct IncludeExpander<R: LibraryRoots = LibDirs, P: Preprocessor = HeaderPreprocessor> {
    config: Config,
    roots: R,
    service: P,
}

impl IncludeExpander<LibDirs, HeaderPreprocessor> {
    /// Expander using the configured library directories and the built-in
    /// header preprocessor.
    pub fn from_config(config: Config) -> Self {
        let roots = LibDirs::from_config(&config);
        let service = HeaderPreprocessor::new().with_include_paths(config.include_paths.clone());
        Self::new(config, roots, service)
    }
}

impl<R: LibraryRoots, P: Preprocessor> IncludeExpander<R, P> {
    pub fn new(config: Config, roots: R, service: P) -> Self {
        Self {
            config,
            roots,
            service,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handles one include directive given its arguments.
    pub fn expand_directive(
        &self,
        directive: Directive,
        args: &[AstNode],
        mut state: ExpandState,
    ) -> Result<Expanded, HdrError> {
        let form = self.directive_into(directive, args, &mut state)?;
        Ok(Expanded { form, state })
    }

    /// Loads and translates an already resolved path.
    pub fn include_path(&self, path: &Path, mut state: ExpandState) -> Result<Expanded, HdrError> {
        let form = self.include_into(path, &mut state)?;
        Ok(Expanded { form, state })
    }

    /// Expands `form` if it is an include directive; `Ok(None)` otherwise.
    ///
    /// On error `state` is left as it was before the call.
    pub fn expand_form(
        &self,
        form: &AstNode,
        state: &mut ExpandState,
    ) -> Result<Option<AstNode>, HdrError> {
        let Some((directive, args)) = Directive::parse(form) else {
            return Ok(None);
        };
        self.directive_into(directive, args, state).map(Some)
    }

    /// Replaces every top-level include directive in `forms` by its result.
    pub fn expand_program(
        &self,
        forms: Vec<AstNode>,
        mut state: ExpandState,
    ) -> Result<(Vec<AstNode>, ExpandState), HdrError> {
        let forms = self.expand_forms_into(forms, &mut state)?;
        Ok((forms, state))
    }

    // ------------------------------------------------------------------------
    // In-place expansion
    // ------------------------------------------------------------------------

    fn directive_into(
        &self,
        directive: Directive,
        args: &[AstNode],
        state: &mut ExpandState,
    ) -> Result<AstNode, HdrError> {
        let target = resolver::directive_target(directive.name(), args)?;
        let base_dir = state.current_file.as_deref().and_then(Path::parent);
        let path = match directive {
            Directive::IncludeFile => resolver::resolve_file(&target, base_dir, &self.config)?,
            Directive::IncludeLib => {
                resolver::resolve_lib(&target, base_dir, &self.config, &self.roots)?
            }
        };
        self.include_into(&path, state)
    }

    /// Appends to `state` only when the include succeeds. The current file
    /// and nesting depth are back to their outer values either way.
    fn include_into(&self, path: &Path, state: &mut ExpandState) -> Result<AstNode, HdrError> {
        let mark = state.mark();
        let result = self.translate_path(path, state);
        if result.is_err() {
            state.included.truncate(mark.included);
            state.warnings.truncate(mark.warnings);
        }
        state.current_file = mark.current_file;
        state.depth = mark.depth;
        result
    }

    fn translate_path(&self, path: &Path, state: &mut ExpandState) -> Result<AstNode, HdrError> {
        info!("including {}", path.display());
        state.included.push(path.to_path_buf());

        match resolver::classify(path, &self.config) {
            SourceKind::Foreign => {
                let (forms, table) = loader::load_foreign(&self.service, path)?;
                let records = records::translate_records(&forms, path, &mut state.warnings);
                let macros = macros::translate_macros(&table, path, &mut state.warnings);
                debug!(
                    "{}: {} records, {} macros translated",
                    path.display(),
                    records.len(),
                    macros.len()
                );
                Ok(assemble::assemble(records, macros))
            }
            SourceKind::Native => {
                if state.depth >= self.config.max_include_depth {
                    return Err(HdrError::bare(ErrorKind::RecursionLimit, "include").with_help(
                        format!(
                            "native includes nest deeper than {}; check for an include cycle at {}",
                            self.config.max_include_depth,
                            path.display()
                        ),
                    ));
                }
                let forms = loader::load_native(path)?;
                state.current_file = Some(path.to_path_buf());
                state.depth += 1;
                let forms = self.expand_forms_into(forms, state)?;
                Ok(assemble::assemble_native(forms))
            }
        }
    }

    fn expand_forms_into(
        &self,
        forms: Vec<AstNode>,
        state: &mut ExpandState,
    ) -> Result<Vec<AstNode>, HdrError> {
        let mut out = Vec::with_capacity(forms.len());
        for form in forms {
            match self.expand_form(&form, state)? {
                Some(replacement) => out.push(replacement),
                None => out.push(form),
            }
        }
        Ok(out)
    }
}
