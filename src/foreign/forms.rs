//! Structural forms produced by the preprocessing service.

use std::fmt;

use super::expr::ForeignNode;

/// One top-level form of a preprocessed header.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Record(RecordDecl),
    Function {
        name: String,
        arity: usize,
        line: usize,
    },
    TypeDecl {
        name: String,
        line: usize,
    },
    /// Any other `-name(...)` attribute, e.g. `-export`.
    Attribute {
        name: String,
        line: usize,
    },
    Error(FormError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub fields: Vec<RecordField>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub default: Option<ForeignNode>,
    /// Type annotation text after `::`; not used by translation.
    pub ty: Option<String>,
}

/// A form the preprocessor could not make sense of.
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    pub line: usize,
    pub message: String,
}

impl Form {
    pub fn line(&self) -> usize {
        match self {
            Form::Record(decl) => decl.line,
            Form::Function { line, .. }
            | Form::TypeDecl { line, .. }
            | Form::Attribute { line, .. } => *line,
            Form::Error(err) => err.line,
        }
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Record(decl) => write!(f, "record {}", decl.name),
            Form::Function { name, arity, .. } => write!(f, "function {}/{}", name, arity),
            Form::TypeDecl { name, .. } => write!(f, "type {}", name),
            Form::Attribute { name, .. } => write!(f, "attribute -{}", name),
            Form::Error(err) => write!(f, "error at line {}: {}", err.line, err.message),
        }
    }
}
