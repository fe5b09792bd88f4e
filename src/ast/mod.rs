//! AST module for the native Lisp dialect
//!
//! Every form the importer produces, and every form the native reader returns,
//! is an [`AstNode`]: an [`Expr`] behind shared ownership, tagged with the
//! span it came from.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Represents a span in the source code.
///
/// # Examples
///
/// ```rust
/// use hdrlisp::ast::Span;
/// let span = Span { start: 0, end: 5 };
/// assert_eq!(span.end - span.start, 5);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Wrapper for carrying source span information with any value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

/// Canonical AST node type with shared ownership.
pub type AstNode = Spanned<Arc<Expr>>;

/// The core AST node for native expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    List(Vec<AstNode>),
    Symbol(String),
    String(String),
    Integer(i64),
    Float(f64),
    /// `'form`
    Quote(Box<AstNode>),
    /// `` `form `` - quasi-quote template
    Backquote(Box<AstNode>),
    /// `,form` - substitution point inside a template
    Comma(Box<AstNode>),
    /// `,@form` - splicing substitution point inside a template
    CommaAt(Box<AstNode>),
}

/// Characters that end a bare symbol in the reader.
const SYMBOL_DELIMITERS: &[char] = &['(', ')', '[', ']', '"', ';', '\'', '`', ',', '|', '\\'];

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Expr {
    /// Returns the list items if this expression is a list.
    pub fn as_list(&self) -> Option<&[AstNode]> {
        match self {
            Expr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the symbol name if this expression is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the head symbol of a list form, e.g. `defmacro` for `(defmacro ...)`.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.value.as_symbol()
    }

    /// Pretty-prints the expression as a string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hdrlisp::ast::Expr;
    /// assert_eq!(Expr::Symbol("foo".to_string()).pretty(), "foo");
    /// assert_eq!(Expr::Float(2.0).pretty(), "2.0");
    /// assert_eq!(Expr::Float(1e20).pretty(), "1.0e20");
    /// assert_eq!(Expr::Symbol("hello world".to_string()).pretty(), "|hello world|");
    /// ```
    pub fn pretty(&self) -> String {
        match self {
            Expr::List(items) => Self::pretty_list(items),
            Expr::Symbol(s) => Self::pretty_symbol(s),
            Expr::String(s) => Self::pretty_string(s),
            Expr::Integer(n) => n.to_string(),
            Expr::Float(n) => Self::pretty_float(*n),
            Expr::Quote(inner) => format!("'{}", inner.value.pretty()),
            Expr::Backquote(inner) => format!("`{}", inner.value.pretty()),
            Expr::Comma(inner) => format!(",{}", inner.value.pretty()),
            Expr::CommaAt(inner) => format!(",@{}", inner.value.pretty()),
        }
    }

    // ------------------------------------------------------------------------
    // Pretty-printing helpers
    // ------------------------------------------------------------------------

    fn pretty_list(items: &[AstNode]) -> String {
        let inner = items
            .iter()
            .map(|e| e.value.pretty())
            .collect::<Vec<_>>()
            .join(" ");
        format!("({})", inner)
    }

    /// Symbols the reader would split, or read as a number, go between bars.
    fn pretty_symbol(s: &str) -> String {
        let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
        let numeric = unsigned.starts_with(|c: char| c.is_ascii_digit());
        let needs_bars = s.is_empty()
            || numeric
            || s.chars().any(|c| c.is_whitespace() || SYMBOL_DELIMITERS.contains(&c));
        if !needs_bars {
            return s.to_string();
        }

        let mut out = String::with_capacity(s.len() + 2);
        out.push('|');
        for ch in s.chars() {
            if ch == '|' || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push('|');
        out
    }

    /// Always carries a `.` so the text reads back as a float.
    fn pretty_float(n: f64) -> String {
        let mut text = format!("{:?}", n);
        if n.is_finite() && !text.contains('.') {
            let at = text.find('e').unwrap_or(text.len());
            text.insert_str(at, ".0");
        }
        text
    }

    fn pretty_string(s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                other => out.push(other),
            }
        }
        out.push('"');
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

// ============================================================================
// MODULE EXPORTS
// ============================================================================

pub mod builder;

#[cfg(test)]
mod tests {
    use super::builder::*;
    use super::*;

    #[test]
    fn test_pretty_template() {
        let span = Span::default();
        let n = make_symbol("N", span);
        let body = make_list(
            vec![
                make_symbol("*", span),
                make_comma(n.clone(), span),
                make_comma(n, span),
            ],
            span,
        );
        let tpl = make_backquote(body, span);
        assert_eq!(tpl.value.pretty(), "`(* ,N ,N)");
    }

    #[test]
    fn test_pretty_string_escapes() {
        let expr = Expr::String("a \"b\"\n".to_string());
        assert_eq!(expr.pretty(), r#""a \"b\"\n""#);
    }

    #[test]
    fn test_pretty_symbols_needing_bars() {
        let sym = |s: &str| Expr::Symbol(s.to_string()).pretty();
        assert_eq!(sym("m:f"), "m:f");
        assert_eq!(sym("-"), "-");
        assert_eq!(sym("=:="), "=:=");
        assert_eq!(sym("hello world"), "|hello world|");
        assert_eq!(sym("42"), "|42|");
        assert_eq!(sym("-1"), "|-1|");
        assert_eq!(sym(""), "||");
        assert_eq!(sym("a|b"), r"|a\|b|");
        assert_eq!(sym("(x)"), "|(x)|");
    }

    #[test]
    fn test_pretty_floats_keep_a_point() {
        assert_eq!(Expr::Float(1.5).pretty(), "1.5");
        assert_eq!(Expr::Float(1e20).pretty(), "1.0e20");
        assert_eq!(Expr::Float(2.5e-7).pretty(), "2.5e-7");
        assert_eq!(Expr::Float(-3.0).pretty(), "-3.0");
    }

    #[test]
    fn test_head_symbol() {
        let span = Span::default();
        let form = make_list(
            vec![make_symbol("defrecord", span), make_symbol("point", span)],
            span,
        );
        assert_eq!(form.value.head_symbol(), Some("defrecord"));
        assert_eq!(Expr::Integer(1).head_symbol(), None);
    }
}
