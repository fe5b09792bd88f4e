//! Expression parser for the foreign header dialect.
//!
//! A precedence-climbing parser over a token slice. It accepts a
//! comma-separated sequence of expressions and leaves the decision of how
//! many are acceptable to the caller.

use super::expr::{join_spans, node, ForeignExpr, ForeignNode};
use super::token::{Token, TokenKind};
use crate::ast::Span;
use crate::errors::{to_source_span, ErrorReporting, HdrError, PhaseContext};

/// Binding power of prefix operators.
const PREFIX_PRECEDENCE: u8 = 60;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses `E1, E2, ...` consuming every token.
pub fn parse_exprs(tokens: &[Token], ctx: &PhaseContext) -> Result<Vec<ForeignNode>, HdrError> {
    let mut parser = ExprParser::new(tokens, ctx);
    if parser.at_end() {
        return Ok(vec![]);
    }
    let exprs = parser.expr_sequence()?;
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected("',' or end of expression", token));
    }
    Ok(exprs)
}

/// Parses exactly one expression consuming every token.
pub fn parse_single_expr(tokens: &[Token], ctx: &PhaseContext) -> Result<ForeignNode, HdrError> {
    let mut exprs = parse_exprs(tokens, ctx)?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        0 => Err(ctx.missing_element("expression", span_of(tokens))),
        n => Err(ctx.unexpected_token(
            "a single expression",
            &format!("{} expressions", n),
            span_of(tokens),
        )),
    }
}

// ============================================================================
// PARSER
// ============================================================================

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    ctx: &'t PhaseContext,
}

impl<'t> ExprParser<'t> {
    fn new(tokens: &'t [Token], ctx: &'t PhaseContext) -> Self {
        Self {
            tokens,
            pos: 0,
            ctx,
        }
    }

    fn expr_sequence(&mut self) -> Result<Vec<ForeignNode>, HdrError> {
        let mut exprs = vec![self.expr()?];
        while self.eat_punct(",") {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn expr(&mut self) -> Result<ForeignNode, HdrError> {
        self.binary(0)
    }

    fn binary(&mut self, min_prec: u8) -> Result<ForeignNode, HdrError> {
        let mut lhs = self.unary()?;
        while let Some((op, prec, assoc)) = self.peek().and_then(binary_operator) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_min = match assoc {
                Assoc::Left => prec + 1,
                Assoc::Right => prec,
            };
            let rhs = self.binary(next_min)?;
            let span = join_spans(lhs.span, rhs.span);
            lhs = node(
                ForeignExpr::BinaryOp {
                    op: op.to_string(),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<ForeignNode, HdrError> {
        let Some(token) = self.peek() else {
            return Err(self.end_of_input("expression"));
        };
        let op = match &token.kind {
            TokenKind::Punct(p @ ("+" | "-")) => Some(p.to_string()),
            TokenKind::Reserved(w) if w == "not" || w == "bnot" => Some(w.clone()),
            _ => None,
        };
        let Some(op) = op else {
            return self.postfix();
        };
        let start = token.span;
        self.pos += 1;
        let operand = self.binary(PREFIX_PRECEDENCE)?;
        let span = join_spans(start, operand.span);
        Ok(node(
            ForeignExpr::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn postfix(&mut self) -> Result<ForeignNode, HdrError> {
        let mut expr = self.primary()?;
        loop {
            if self.check_punct(":") {
                self.pos += 1;
                let function = self.primary()?;
                self.expect_punct("(")?;
                let (args, end) = self.call_args()?;
                let span = join_spans(expr.span, end);
                expr = node(
                    ForeignExpr::RemoteCall {
                        module: Box::new(expr),
                        function: Box::new(function),
                        args,
                    },
                    span,
                );
            } else if self.check_punct("(") {
                self.pos += 1;
                let (args, end) = self.call_args()?;
                let span = join_spans(expr.span, end);
                expr = node(
                    ForeignExpr::Call {
                        target: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Arguments after an opening `(`, returning the span of the closing `)`.
    fn call_args(&mut self) -> Result<(Vec<ForeignNode>, Span), HdrError> {
        if let Some(close) = self.eat_punct_span(")") {
            return Ok((vec![], close));
        }
        let args = self.expr_sequence()?;
        let close = self.expect_punct(")")?;
        Ok((args, close))
    }

    fn primary(&mut self) -> Result<ForeignNode, HdrError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.end_of_input("expression"));
        };
        self.pos += 1;
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Var(name) => ForeignExpr::Var(name),
            TokenKind::Atom(name) => ForeignExpr::Atom(name),
            TokenKind::Integer(n) => ForeignExpr::Integer(n),
            TokenKind::Float(n) => ForeignExpr::Float(n),
            TokenKind::Char(c) => ForeignExpr::Char(c),
            TokenKind::Unquote(name) => ForeignExpr::Unquote(name),
            TokenKind::Str(first) => return Ok(self.string_run(first, span)),
            TokenKind::Punct("(") => {
                let inner = self.expr()?;
                let close = self.expect_punct(")")?;
                return Ok(node(inner.value, join_spans(span, close)));
            }
            TokenKind::Punct("{") => return self.tuple(span),
            TokenKind::Punct("[") => return self.list(span),
            TokenKind::Punct("#") => return self.record(span),
            TokenKind::Reserved(ref word) if word == "begin" => return self.block(span),
            TokenKind::Reserved(ref word) => {
                return Err(self.ctx.unsupported(
                    &format!("'{}' expression", word),
                    to_source_span(span),
                ))
            }
            TokenKind::Punct("?") => {
                return Err(self
                    .ctx
                    .unsupported("unexpanded macro reference", to_source_span(span)))
            }
            _ => return Err(self.unexpected("expression", &token)),
        };
        Ok(node(expr, span))
    }

    /// Adjacent string literals concatenate.
    fn string_run(&mut self, first: String, start: Span) -> ForeignNode {
        let mut text = first;
        let mut span = start;
        while let Some(Token {
            kind: TokenKind::Str(next),
            span: next_span,
            ..
        }) = self.peek()
        {
            text.push_str(next);
            span = join_spans(span, *next_span);
            self.pos += 1;
        }
        node(ForeignExpr::Str(text), span)
    }

    fn tuple(&mut self, open: Span) -> Result<ForeignNode, HdrError> {
        if let Some(close) = self.eat_punct_span("}") {
            return Ok(node(ForeignExpr::Tuple(vec![]), join_spans(open, close)));
        }
        let items = self.expr_sequence()?;
        let close = self.expect_punct("}")?;
        Ok(node(ForeignExpr::Tuple(items), join_spans(open, close)))
    }

    fn list(&mut self, open: Span) -> Result<ForeignNode, HdrError> {
        if let Some(close) = self.eat_punct_span("]") {
            return Ok(node(ForeignExpr::Nil, join_spans(open, close)));
        }
        let items = self.expr_sequence()?;
        let tail = if self.eat_punct("|") {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        let close = self.expect_punct("]")?;
        Ok(node(ForeignExpr::List { items, tail }, join_spans(open, close)))
    }

    fn record(&mut self, hash: Span) -> Result<ForeignNode, HdrError> {
        let name = self.expect_atom("record name")?;
        self.expect_punct("{")?;
        let mut fields = Vec::new();
        if let Some(close) = self.eat_punct_span("}") {
            return Ok(node(ForeignExpr::Record { name, fields }, join_spans(hash, close)));
        }
        loop {
            let field = self.expect_atom("record field name")?;
            self.expect_punct("=")?;
            fields.push((field, self.expr()?));
            if !self.eat_punct(",") {
                break;
            }
        }
        let close = self.expect_punct("}")?;
        Ok(node(ForeignExpr::Record { name, fields }, join_spans(hash, close)))
    }

    fn block(&mut self, begin: Span) -> Result<ForeignNode, HdrError> {
        let body = self.expr_sequence()?;
        match self.peek() {
            Some(token) if token.is_reserved("end") => {
                let end = token.span;
                self.pos += 1;
                Ok(node(ForeignExpr::Block(body), join_spans(begin, end)))
            }
            Some(token) => Err(self.unexpected("'end'", token)),
            None => Err(self.end_of_input("'end'")),
        }
    }

    // ------------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        self.eat_punct_span(p).is_some()
    }

    fn eat_punct_span(&mut self, p: &str) -> Option<Span> {
        let token = self.peek().filter(|t| t.is_punct(p))?;
        self.pos += 1;
        Some(token.span)
    }

    fn expect_punct(&mut self, p: &str) -> Result<Span, HdrError> {
        if let Some(span) = self.eat_punct_span(p) {
            return Ok(span);
        }
        match self.peek() {
            Some(token) => Err(self.unexpected(&format!("'{}'", p), token)),
            None => Err(self.end_of_input(&format!("'{}'", p))),
        }
    }

    fn expect_atom(&mut self, what: &str) -> Result<String, HdrError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Atom(name),
                ..
            }) => {
                self.pos += 1;
                Ok(name.clone())
            }
            Some(token) => Err(self.unexpected(what, token)),
            None => Err(self.end_of_input(what)),
        }
    }

    fn unexpected(&self, expected: &str, found: &Token) -> HdrError {
        self.ctx
            .unexpected_token(expected, &found.to_string(), to_source_span(found.span))
    }

    fn end_of_input(&self, expected: &str) -> HdrError {
        let at = self.tokens.last().map(|t| t.span.end).unwrap_or_default();
        self.ctx.unexpected_token(
            expected,
            "end of expression",
            to_source_span(Span { start: at, end: at }),
        )
    }
}

// ============================================================================
// OPERATOR TABLE
// ============================================================================

fn binary_operator(token: &Token) -> Option<(&'static str, u8, Assoc)> {
    let name: &str = match &token.kind {
        TokenKind::Punct(p) => *p,
        TokenKind::Reserved(w) => w.as_str(),
        _ => return None,
    };
    let entry = match name {
        "=" => ("=", 10, Assoc::Right),
        "!" => ("!", 10, Assoc::Right),
        "orelse" => ("orelse", 15, Assoc::Right),
        "andalso" => ("andalso", 16, Assoc::Right),
        "==" => ("==", 20, Assoc::Left),
        "/=" => ("/=", 20, Assoc::Left),
        "=<" => ("=<", 20, Assoc::Left),
        "<" => ("<", 20, Assoc::Left),
        ">=" => (">=", 20, Assoc::Left),
        ">" => (">", 20, Assoc::Left),
        "=:=" => ("=:=", 20, Assoc::Left),
        "=/=" => ("=/=", 20, Assoc::Left),
        "++" => ("++", 30, Assoc::Right),
        "--" => ("--", 30, Assoc::Right),
        "+" => ("+", 40, Assoc::Left),
        "-" => ("-", 40, Assoc::Left),
        "bor" => ("bor", 40, Assoc::Left),
        "bxor" => ("bxor", 40, Assoc::Left),
        "bsl" => ("bsl", 40, Assoc::Left),
        "bsr" => ("bsr", 40, Assoc::Left),
        "or" => ("or", 40, Assoc::Left),
        "xor" => ("xor", 40, Assoc::Left),
        "*" => ("*", 50, Assoc::Left),
        "/" => ("/", 50, Assoc::Left),
        "div" => ("div", 50, Assoc::Left),
        "rem" => ("rem", 50, Assoc::Left),
        "band" => ("band", 50, Assoc::Left),
        "and" => ("and", 50, Assoc::Left),
        _ => return None,
    };
    Some(entry)
}

fn span_of(tokens: &[Token]) -> miette::SourceSpan {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => to_source_span(join_spans(first.span, last.span)),
        _ => crate::errors::unspanned(),
    }
}
