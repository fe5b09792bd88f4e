//! hdrlisp Error Handling - Unified Diagnostic API
//!
//! Every failure in the importer is a [`HdrError`]: request-level failures are
//! returned as `Err`, definition-level failures are downgraded to warnings and
//! collected in the caller's expansion state.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text attached to a diagnostic.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("; {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single error type - what went wrong, where, and how to help.
#[derive(Debug)]
pub struct HdrError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened
    pub source_info: SourceInfo,
    /// How to help
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Request-level failures: the whole include is aborted
    #[error("bad include argument: {message}")]
    BadArgument { message: String },
    #[error("unable to read `{path}`: {reason}")]
    ReadError { path: String, reason: String },

    // Definition-level failures: reported as warnings, the definition is omitted
    #[error("unable to translate record `{record}`: {reason}")]
    RecordTranslation { record: String, reason: String },
    #[error("unable to translate macro `{macro_name}`: {reason}")]
    MacroTranslation { macro_name: String, reason: String },
    #[error("dropped header form: {description}")]
    DroppedForm { description: String },

    // Syntax failures in either dialect
    #[error("missing {element}")]
    MissingElement { element: String },
    #[error("malformed {construct}")]
    MalformedConstruct { construct: String },
    #[error("invalid {literal_type} '{value}'")]
    InvalidLiteral { literal_type: String, value: String },
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String },

    // Preprocessing failures
    #[error("undefined macro '{name}'")]
    UndefinedMacro { name: String },
    #[error("macro expansion recursion limit exceeded")]
    RecursionLimit,
}

/// Context-specific source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
    pub is_warning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Definition,
    Syntax,
    Preprocess,
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BadArgument { .. } | Self::ReadError { .. } => ErrorCategory::Request,

            Self::RecordTranslation { .. }
            | Self::MacroTranslation { .. }
            | Self::DroppedForm { .. } => ErrorCategory::Definition,

            Self::MissingElement { .. }
            | Self::MalformedConstruct { .. }
            | Self::InvalidLiteral { .. }
            | Self::UnexpectedToken { .. }
            | Self::Unsupported { .. } => ErrorCategory::Syntax,

            Self::UndefinedMacro { .. } | Self::RecursionLimit => ErrorCategory::Preprocess,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::BadArgument { .. } => "bad_argument",
            Self::ReadError { .. } => "read_error",
            Self::RecordTranslation { .. } => "record_translation",
            Self::MacroTranslation { .. } => "macro_translation",
            Self::DroppedForm { .. } => "dropped_form",
            Self::MissingElement { .. } => "missing_element",
            Self::MalformedConstruct { .. } => "malformed_construct",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::UnexpectedToken { .. } => "unexpected_token",
            Self::Unsupported { .. } => "unsupported",
            Self::UndefinedMacro { .. } => "undefined_macro",
            Self::RecursionLimit => "recursion_limit",
        }
    }

    fn primary_label(&self) -> &'static str {
        match self {
            Self::BadArgument { .. } => "bad argument",
            Self::ReadError { .. } => "unreadable",
            Self::RecordTranslation { .. } => "record omitted",
            Self::MacroTranslation { .. } => "macro omitted",
            Self::DroppedForm { .. } => "form dropped",
            Self::MissingElement { .. } => "missing here",
            Self::MalformedConstruct { .. } => "malformed syntax",
            Self::InvalidLiteral { .. } => "invalid literal",
            Self::UnexpectedToken { .. } => "unexpected token",
            Self::Unsupported { .. } => "unsupported",
            Self::UndefinedMacro { .. } => "undefined macro",
            Self::RecursionLimit => "recursion limit exceeded",
        }
    }

    fn default_help(&self) -> Option<&'static str> {
        match self {
            Self::BadArgument { .. } => {
                Some("include directives take exactly one string argument naming a file")
            }
            Self::MacroTranslation { .. } => {
                Some("the clause body uses a construct with no native equivalent; the remaining clauses are still imported")
            }
            Self::Unsupported { .. } => {
                Some("rewrite the definition using plain expressions, calls, lists or tuples")
            }
            _ => None,
        }
    }
}

impl HdrError {
    /// Creates an error that is not tied to any source text, such as I/O failures.
    pub fn bare(kind: ErrorKind, phase: &str) -> Self {
        PhaseContext::new(SourceContext::fallback(phase), phase).report(kind, unspanned())
    }

    /// Downgrades this error to a warning.
    pub fn into_warning(mut self) -> Self {
        self.diagnostic_info.is_warning = true;
        self
    }

    /// Attaches a help message, replacing the default one.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.diagnostic_info.help = Some(help.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.diagnostic_info.is_warning
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl std::error::Error for HdrError {}

impl fmt::Display for HdrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for HdrError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        if self.diagnostic_info.is_warning {
            Some(miette::Severity::Warning)
        } else {
            Some(miette::Severity::Error)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.kind.primary_label().to_string()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

// ============================================================================
// ERROR CONSTRUCTION
// ============================================================================

/// Context-aware error creation
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> HdrError;

    fn unexpected_token(&self, expected: &str, found: &str, span: SourceSpan) -> HdrError {
        self.report(
            ErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: found.into(),
            },
            span,
        )
    }

    fn missing_element(&self, element: &str, span: SourceSpan) -> HdrError {
        self.report(
            ErrorKind::MissingElement {
                element: element.into(),
            },
            span,
        )
    }

    fn unsupported(&self, construct: &str, span: SourceSpan) -> HdrError {
        self.report(
            ErrorKind::Unsupported {
                construct: construct.into(),
            },
            span,
        )
    }
}

/// General-purpose error creation context: a source plus the pipeline phase.
#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub source: SourceContext,
    pub phase: String,
}

impl PhaseContext {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for PhaseContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> HdrError {
        let error_code = format!("hdrlisp::{}::{}", self.phase, kind.code_suffix());
        let help = kind.default_help().map(String::from);

        HdrError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help,
                error_code,
                is_warning: false,
            },
        }
    }
}

/// Placeholder span for errors not tied to a source location.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Converts an AST span to a miette SourceSpan.
pub fn to_source_span(span: crate::ast::Span) -> SourceSpan {
    SourceSpan::from(span.start..span.end)
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints an error or warning with full miette diagnostics to stderr.
pub fn print_error(error: HdrError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_messages_name_the_definition() {
        let record = ErrorKind::RecordTranslation {
            record: "point".into(),
            reason: "bad default".into(),
        };
        let mac = ErrorKind::MacroTranslation {
            macro_name: "SQ".into(),
            reason: "no clause survived".into(),
        };
        assert!(record.to_string().starts_with("unable to translate record `point`"));
        assert!(mac.to_string().starts_with("unable to translate macro `SQ`"));
    }

    #[test]
    fn test_error_codes_carry_phase() {
        let ctx = PhaseContext::new(SourceContext::from_file("a.hrl", "x"), "include");
        let err = ctx.report(
            ErrorKind::BadArgument {
                message: "nope".into(),
            },
            unspanned(),
        );
        assert_eq!(err.diagnostic_info.error_code, "hdrlisp::include::bad_argument");
        assert_eq!(err.category(), ErrorCategory::Request);
        assert!(err.diagnostic_info.help.is_some());
    }

    #[test]
    fn test_macro_translation_help_names_the_construct() {
        let ctx = PhaseContext::new(SourceContext::from_file("a.hrl", ""), "macros");
        let err = ctx.report(
            ErrorKind::MacroTranslation {
                macro_name: "M".into(),
                reason: "M/none at line 1: unsupported".into(),
            },
            unspanned(),
        );
        let help = err.diagnostic_info.help.unwrap_or_default();
        assert!(help.contains("no native equivalent"));
        assert!(!help.contains("single-expression"));
    }

    #[test]
    fn test_into_warning_sets_severity() {
        let err = HdrError::bare(ErrorKind::RecursionLimit, "preprocess").into_warning();
        assert!(err.is_warning());
        assert_eq!(err.severity(), Some(miette::Severity::Warning));
    }
}
