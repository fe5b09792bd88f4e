//! Tokens of the foreign header dialect.

use std::fmt;

use crate::ast::Span;

/// Words that are operators or block keywords rather than plain atoms.
pub const RESERVED_WORDS: &[&str] = &[
    "after", "and", "andalso", "band", "begin", "bnot", "bor", "bsl", "bsr", "bxor", "case",
    "catch", "cond", "div", "end", "fun", "if", "let", "maybe", "not", "of", "or", "orelse",
    "receive", "rem", "try", "when", "xor",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Variable-like name: starts with an upper-case letter or `_`.
    Var(String),
    Atom(String),
    Reserved(String),
    Integer(i64),
    Float(f64),
    Str(String),
    Char(char),
    Punct(&'static str),
    /// Form terminator `.`
    Dot,
    /// Reference to a macro argument, substituted at expansion time.
    Unquote(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, line: usize) -> Self {
        Self { kind, span, line }
    }

    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Reserved(w) if w == word)
    }

    /// Name carried by a `Var` or `Atom` token.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Var(name) | TokenKind::Atom(name) => Some(name),
            _ => None,
        }
    }

    /// Copy of this token with a different kind, keeping its position.
    pub fn with_kind(&self, kind: TokenKind) -> Self {
        Self {
            kind,
            span: self.span,
            line: self.line,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Var(name) => write!(f, "{}", name),
            TokenKind::Atom(name) => {
                if is_plain_atom(name) {
                    write!(f, "{}", name)
                } else {
                    write!(f, "'{}'", name.replace('\'', "\\'"))
                }
            }
            TokenKind::Reserved(word) => write!(f, "{}", word),
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(n) => write!(f, "{:?}", n),
            TokenKind::Str(s) => write!(f, "{:?}", s),
            TokenKind::Char(c) => write!(f, "${}", c),
            TokenKind::Punct(p) => write!(f, "{}", p),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Unquote(name) => write!(f, ",{}", name),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Renders a token run back into header-like text, for diagnostics.
pub fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_plain_atom(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '@')
        && !RESERVED_WORDS.contains(&name)
}
