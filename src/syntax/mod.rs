//! Native reader for the Lisp dialect the importer produces.
//!
//! The reader is purely syntactic: it turns source text into [`AstNode`]s and
//! never interprets the forms it reads.
//!
//! [`AstNode`]: crate::ast::AstNode

pub mod parser;
