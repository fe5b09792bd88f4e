//! hdrlisp imports foreign header declarations, `-record` and `-define`,
//! into a Lisp dialect as `defrecord` and `defmacro` forms.

pub use crate::ast::{AstNode, Expr, Span, Spanned};
pub use crate::config::Config;
pub use crate::errors::{ErrorKind, HdrError};
pub use crate::include::{Directive, ExpandState, Expanded, IncludeExpander};

pub mod ast;
pub mod cli;
pub mod config;
pub mod errors;
pub mod foreign;
pub mod include;
pub mod syntax;
