//! # AST Constructors
//!
//! Small constructors shared by the native reader, the expression converter
//! and the translators. Every node is built with the span it is attributed to.

use std::sync::Arc;

use super::{AstNode, Expr, Span, Spanned};

pub fn make_list(items: Vec<AstNode>, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::List(items)),
        span,
    }
}

pub fn make_symbol(text: &str, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Symbol(text.to_string())),
        span,
    }
}

pub fn make_string(content: String, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::String(content)),
        span,
    }
}

pub fn make_integer(value: i64, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Integer(value)),
        span,
    }
}

pub fn make_float(value: f64, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Float(value)),
        span,
    }
}

pub fn make_quote(expr: AstNode, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Quote(Box::new(expr))),
        span,
    }
}

pub fn make_backquote(expr: AstNode, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Backquote(Box::new(expr))),
        span,
    }
}

pub fn make_comma(expr: AstNode, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::Comma(Box::new(expr))),
        span,
    }
}

pub fn make_comma_at(expr: AstNode, span: Span) -> AstNode {
    Spanned {
        value: Arc::new(Expr::CommaAt(Box::new(expr))),
        span,
    }
}

/// `(head item...)`
pub fn make_call(head: &str, args: Vec<AstNode>, span: Span) -> AstNode {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(make_symbol(head, span));
    items.extend(args);
    make_list(items, span)
}

/// Span covering a sequence of nodes.
pub fn calculate_span(nodes: &[AstNode]) -> Span {
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) => Span {
            start: first.span.start,
            end: last.span.end,
        },
        _ => Span::default(),
    }
}
