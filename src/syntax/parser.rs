//! Native Reader - pest-based implementation
//!
//! Converts native source text into AST nodes with source location tracking.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::ast::builder::*;
use crate::ast::{AstNode, Span};
use crate::errors::{to_source_span, ErrorKind, ErrorReporting, HdrError, PhaseContext, SourceContext};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct NativeParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse native source code into AST nodes
pub fn parse(source_text: &str, source_context: SourceContext) -> Result<Vec<AstNode>, HdrError> {
    let ctx = PhaseContext::new(source_context, "read");
    if source_text.trim().is_empty() {
        return Ok(vec![]);
    }

    let mut pairs = NativeParser::parse(Rule::program, source_text)
        .map_err(|e| convert_parse_error(e, &ctx))?;

    let Some(program) = pairs.next() else {
        return Ok(vec![]);
    };

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_ast_node(p, &ctx))
        .collect()
}

// ============================================================================
// AST BUILDERS
// ============================================================================

fn build_ast_node(pair: Pair<Rule>, ctx: &PhaseContext) -> Result<AstNode, HdrError> {
    let span = get_span(&pair);

    match pair.as_rule() {
        Rule::expr | Rule::atom => {
            let inner = first_inner(pair, "expression", ctx)?;
            build_ast_node(inner, ctx)
        }

        Rule::integer => {
            let text = pair.as_str();
            let value = text
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|_| invalid_literal(ctx, "integer", text, span))?;
            Ok(make_integer(value, span))
        }

        Rule::float => {
            let text = pair.as_str();
            let value = text
                .parse::<f64>()
                .map_err(|_| invalid_literal(ctx, "float", text, span))?;
            Ok(make_float(value, span))
        }

        Rule::string => Ok(make_string(unescape_string(pair.as_str()), span)),

        Rule::symbol => Ok(make_symbol(pair.as_str(), span)),

        Rule::quoted_symbol => Ok(make_symbol(&unescape_symbol(pair.as_str()), span)),

        Rule::list | Rule::bracket => {
            let children: Result<Vec<_>, _> =
                pair.into_inner().map(|p| build_ast_node(p, ctx)).collect();
            Ok(make_list(children?, span))
        }

        Rule::quote => {
            let inner = build_ast_node(first_inner(pair, "expression after quote", ctx)?, ctx)?;
            Ok(make_quote(inner, span))
        }

        Rule::backquote => {
            let inner =
                build_ast_node(first_inner(pair, "expression after backquote", ctx)?, ctx)?;
            Ok(make_backquote(inner, span))
        }

        Rule::comma => {
            let inner = build_ast_node(first_inner(pair, "expression after comma", ctx)?, ctx)?;
            Ok(make_comma(inner, span))
        }

        Rule::comma_at => {
            let inner = build_ast_node(first_inner(pair, "expression after ,@", ctx)?, ctx)?;
            Ok(make_comma_at(inner, span))
        }

        rule => Err(ctx.report(
            ErrorKind::MalformedConstruct {
                construct: format!("unsupported rule: {:?}", rule),
            },
            to_source_span(span),
        )),
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn first_inner<'a>(
    pair: Pair<'a, Rule>,
    element: &str,
    ctx: &PhaseContext,
) -> Result<Pair<'a, Rule>, HdrError> {
    let span = get_span(&pair);
    pair.into_inner()
        .next()
        .ok_or_else(|| ctx.missing_element(element, to_source_span(span)))
}

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

fn invalid_literal(ctx: &PhaseContext, literal_type: &str, text: &str, span: Span) -> HdrError {
    ctx.report(
        ErrorKind::InvalidLiteral {
            literal_type: literal_type.into(),
            value: text.into(),
        },
        to_source_span(span),
    )
}

/// `|a\|b|` reads as the symbol `a|b`.
fn unescape_symbol(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => result.extend(chars.next()),
            other => result.push(other),
        }
    }
    result
}

fn unescape_string(text: &str) -> String {
    // Remove surrounding quotes
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn convert_parse_error(error: Error<Rule>, ctx: &PhaseContext) -> HdrError {
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos,
            end: pos,
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };

    let rendered = error.to_string();
    let message = if span.start >= ctx.source.content.len() {
        "form, input ended early (missing closing parenthesis?)"
    } else {
        "syntax"
    };

    ctx.report(
        ErrorKind::MalformedConstruct {
            construct: message.to_string(),
        },
        to_source_span(span),
    )
    .with_help(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn read(src: &str) -> Result<Vec<AstNode>, HdrError> {
        parse(src, SourceContext::from_file("test", src))
    }

    #[test]
    fn test_empty_input() {
        assert!(read("").unwrap().is_empty());
        assert!(read("  ; only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_simple_forms() {
        let nodes = read("(defrecord point x (y 0)) 42 -7 1.5 \"s\"").unwrap();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].value.pretty(), "(defrecord point x (y 0))");
        assert_eq!(*nodes[1].value, Expr::Integer(42));
        assert_eq!(*nodes[2].value, Expr::Integer(-7));
        assert_eq!(*nodes[3].value, Expr::Float(1.5));
        assert_eq!(*nodes[4].value, Expr::String("s".to_string()));
    }

    #[test]
    fn test_quasi_quote_forms() {
        let nodes = read("`(* ,N ,@rest 'a)").unwrap();
        assert_eq!(nodes[0].value.pretty(), "`(* ,N ,@rest 'a)");
    }

    #[test]
    fn test_symbols_with_operators() {
        let nodes = read("(- x) (=:= a b) (m:f 1) (list* a b)").unwrap();
        assert_eq!(nodes[0].value.pretty(), "(- x)");
        assert_eq!(nodes[1].value.pretty(), "(=:= a b)");
        assert_eq!(nodes[2].value.pretty(), "(m:f 1)");
        assert_eq!(nodes[3].value.pretty(), "(list* a b)");
    }

    #[test]
    fn test_barred_symbols() {
        let nodes = read(r"'|hello world| |42| |a\|b| || 1.0e20").unwrap();
        assert_eq!(nodes.len(), 5);
        match &*nodes[0].value {
            Expr::Quote(inner) => assert_eq!(inner.value.as_symbol(), Some("hello world")),
            other => panic!("expected a quoted symbol, got {:?}", other),
        }
        assert_eq!(nodes[1].value.as_symbol(), Some("42"));
        assert_eq!(nodes[2].value.as_symbol(), Some("a|b"));
        assert_eq!(nodes[3].value.as_symbol(), Some(""));
        assert_eq!(*nodes[4].value, Expr::Float(1e20));
    }

    #[test]
    fn test_brackets_read_as_lists() {
        let nodes = read("[a b]").unwrap();
        assert_eq!(nodes[0].value.pretty(), "(a b)");
    }

    #[test]
    fn test_string_escapes() {
        let nodes = read(r#""hello \"world\"\n""#).unwrap();
        assert_eq!(*nodes[0].value, Expr::String("hello \"world\"\n".to_string()));
    }

    #[test]
    fn test_unmatched_paren() {
        let err = read("(a b").unwrap_err();
        assert_eq!(err.diagnostic_info.error_code, "hdrlisp::read::malformed_construct");
    }
}
