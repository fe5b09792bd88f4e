//! Foreign expression to native expression conversion.
//!
//! Literals map onto native literals, atoms become quoted symbols and every
//! compound expression becomes a call form headed by a symbol naming the
//! operation. Argument references become `,Name` substitution points.

use super::expr::{ForeignExpr, ForeignNode};
use crate::ast::builder::*;
use crate::ast::{AstNode, Span};
use crate::errors::{to_source_span, ErrorReporting, HdrError, PhaseContext};

/// Converts a literal foreign expression (atom, number, string, character
/// or `[]`) to its native counterpart.
pub fn literal_to_native(node: &ForeignNode, ctx: &PhaseContext) -> Result<AstNode, HdrError> {
    let span = node.span;
    match &node.value {
        ForeignExpr::Atom(name) => Ok(make_quote(make_symbol(name, span), span)),
        ForeignExpr::Integer(n) => Ok(make_integer(*n, span)),
        ForeignExpr::Float(n) => Ok(make_float(*n, span)),
        ForeignExpr::Str(s) => Ok(make_string(s.clone(), span)),
        ForeignExpr::Char(c) => Ok(make_integer(*c as i64, span)),
        ForeignExpr::Nil => Ok(make_quote(make_list(vec![], span), span)),
        _ => Err(ctx.unexpected_token("literal", "compound expression", to_source_span(span))),
    }
}

/// Converts any supported foreign expression to a native expression.
pub fn expr_to_native(node: &ForeignNode, ctx: &PhaseContext) -> Result<AstNode, HdrError> {
    let span = node.span;
    if node.value.is_literal() {
        return literal_to_native(node, ctx);
    }

    match &node.value {
        ForeignExpr::Var(name) => Ok(make_symbol(name, span)),

        ForeignExpr::Unquote(name) => Ok(make_comma(make_symbol(name, span), span)),

        ForeignExpr::List { items, tail } => {
            let mut args = convert_all(items, ctx)?;
            match tail {
                None => Ok(make_call("list", args, span)),
                Some(tail) => {
                    args.push(expr_to_native(tail, ctx)?);
                    let head = if args.len() == 2 { "cons" } else { "list*" };
                    Ok(make_call(head, args, span))
                }
            }
        }

        ForeignExpr::Tuple(items) => Ok(make_call("tuple", convert_all(items, ctx)?, span)),

        ForeignExpr::BinaryOp { op, .. } if op == "=" => Err(ctx.unsupported(
            "match expression '='",
            to_source_span(span),
        )),

        ForeignExpr::BinaryOp { op, lhs, rhs } => {
            let args = vec![expr_to_native(lhs, ctx)?, expr_to_native(rhs, ctx)?];
            Ok(make_call(op, args, span))
        }

        ForeignExpr::UnaryOp { op, operand } => match negate_literal(op, operand, span) {
            Some(folded) => Ok(folded),
            None => Ok(make_call(op, vec![expr_to_native(operand, ctx)?], span)),
        },

        ForeignExpr::Call { target, args } => {
            let args = convert_all(args, ctx)?;
            match &target.value {
                ForeignExpr::Atom(name) => Ok(make_call(name, args, span)),
                _ => {
                    let mut items = vec![expr_to_native(target, ctx)?];
                    items.extend(args);
                    Ok(make_call("funcall", items, span))
                }
            }
        }

        ForeignExpr::RemoteCall {
            module,
            function,
            args,
        } => {
            let args = convert_all(args, ctx)?;
            match (&module.value, &function.value) {
                (ForeignExpr::Atom(m), ForeignExpr::Atom(f)) => {
                    Ok(make_call(&format!("{}:{}", m, f), args, span))
                }
                _ => {
                    let mut items = vec![expr_to_native(module, ctx)?, expr_to_native(function, ctx)?];
                    items.extend(args);
                    Ok(make_call("call", items, span))
                }
            }
        }

        ForeignExpr::Record { name, fields } => {
            let mut items = Vec::with_capacity(fields.len() * 2);
            for (field, value) in fields {
                items.push(make_symbol(field, value.span));
                items.push(expr_to_native(value, ctx)?);
            }
            Ok(make_call(&format!("make-{}", name), items, span))
        }

        ForeignExpr::Block(body) => Ok(make_call("progn", convert_all(body, ctx)?, span)),

        // literals were handled above
        ForeignExpr::Atom(_)
        | ForeignExpr::Integer(_)
        | ForeignExpr::Float(_)
        | ForeignExpr::Str(_)
        | ForeignExpr::Char(_)
        | ForeignExpr::Nil => literal_to_native(node, ctx),
    }
}

fn convert_all(nodes: &[ForeignNode], ctx: &PhaseContext) -> Result<Vec<AstNode>, HdrError> {
    nodes.iter().map(|n| expr_to_native(n, ctx)).collect()
}

/// `-1` and `-1.5` fold into negative literals.
fn negate_literal(op: &str, operand: &ForeignNode, span: Span) -> Option<AstNode> {
    if op != "-" {
        return None;
    }
    match operand.value {
        ForeignExpr::Integer(n) => Some(make_integer(n.checked_neg()?, span)),
        ForeignExpr::Float(n) => Some(make_float(-n, span)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::foreign::lexer::tokenize;
    use crate::foreign::parser::parse_single_expr;

    fn convert(src: &str) -> Result<String, HdrError> {
        let ctx = PhaseContext::new(SourceContext::from_file("t.hrl", src), "convert");
        let tokens = tokenize(src, &ctx)?;
        let expr = parse_single_expr(&tokens, &ctx)?;
        Ok(expr_to_native(&expr, &ctx)?.value.pretty())
    }

    #[test]
    fn test_literals() {
        assert_eq!(convert("ok").unwrap(), "'ok");
        assert_eq!(convert("42").unwrap(), "42");
        assert_eq!(convert("-3").unwrap(), "-3");
        assert_eq!(convert("\"s\"").unwrap(), "\"s\"");
        assert_eq!(convert("$a").unwrap(), "97");
        assert_eq!(convert("[]").unwrap(), "'()");
    }

    #[test]
    fn test_lists_and_tuples() {
        assert_eq!(convert("[1, 2]").unwrap(), "(list 1 2)");
        assert_eq!(convert("[H | T]").unwrap(), "(cons H T)");
        assert_eq!(convert("[a, b | T]").unwrap(), "(list* 'a 'b T)");
        assert_eq!(convert("{ok, X}").unwrap(), "(tuple 'ok X)");
    }

    #[test]
    fn test_operators_and_calls() {
        assert_eq!(convert("A + B * 2").unwrap(), "(+ A (* B 2))");
        assert_eq!(convert("not X").unwrap(), "(not X)");
        assert_eq!(convert("foo(1)").unwrap(), "(foo 1)");
        assert_eq!(convert("F(1)").unwrap(), "(funcall F 1)");
        assert_eq!(convert("lists:sum(L)").unwrap(), "(lists:sum L)");
        assert_eq!(convert("M:f(L)").unwrap(), "(call M 'f L)");
    }

    #[test]
    fn test_records_and_blocks() {
        assert_eq!(convert("#point{x = 1}").unwrap(), "(make-point x 1)");
        assert_eq!(convert("begin a, b end").unwrap(), "(progn 'a 'b)");
    }

    #[test]
    fn test_match_is_unsupported() {
        let err = convert("X = 1").unwrap_err();
        assert_eq!(err.diagnostic_info.error_code, "hdrlisp::convert::unsupported");
    }

    #[test]
    fn test_literal_converter_rejects_compound() {
        let ctx = PhaseContext::new(SourceContext::from_file("t.hrl", "X"), "convert");
        let var = crate::foreign::expr::node(ForeignExpr::Var("X".into()), Span::default());
        assert!(literal_to_native(&var, &ctx).is_err());
    }
}
