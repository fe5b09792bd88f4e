//! The foreign header dialect.
//!
//! Tokens, the nom lexer and the expression parser, conversion of foreign
//! expressions into native ones, and the preprocessing service that turns a
//! header file into structural forms plus a macro table.

pub mod convert;
pub mod expr;
pub mod forms;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod session;
pub mod table;
pub mod token;

pub use expr::{ForeignExpr, ForeignNode};
pub use forms::{Form, FormError, RecordDecl, RecordField};
pub use preprocess::{HeaderPreprocessor, Preprocessor};
pub use session::{Opened, Parsed, Session};
pub use table::{Arity, MacroDef, MacroEntry, MacroTable};
pub use token::{Token, TokenKind};
