//! nom-based lexer for the foreign header dialect.
//!
//! Produces a flat token stream with byte spans and line numbers. Comments run
//! from `%` to the end of the line. A `.` followed by whitespace, a comment or
//! the end of input terminates a form and is lexed as [`TokenKind::Dot`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace1, not_line_ending, one_of, satisfy},
    combinator::{eof, map, map_res, opt, peek, recognize},
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use super::token::{Token, TokenKind, RESERVED_WORDS};
use crate::ast::Span;
use crate::errors::{to_source_span, ErrorKind, ErrorReporting, HdrError, PhaseContext};

/// Punctuation and operators, longest first so that prefixes never win.
const PUNCTUATION: &[&str] = &[
    "=:=", "=/=", "...", "<<", ">>", "=<", ">=", "==", "/=", "->", "<-", "<=", "||", "++", "--",
    "::", "=>", ":=", "..", "(", ")", "{", "}", "[", "]", ",", ";", ":", "|", "#", "?", "=",
    "+", "-", "*", "/", "<", ">", "!", ".",
];

// ============================================================================
// PUBLIC API
// ============================================================================

/// Tokenizes a complete header source.
pub fn tokenize(source: &str, ctx: &PhaseContext) -> Result<Vec<Token>, HdrError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;

    loop {
        let (after_trivia, skipped) = trivia(rest).map_err(|_| {
            lex_error(ctx, "comment or whitespace", offset(source, rest))
        })?;
        line += skipped.matches('\n').count();
        rest = after_trivia;
        if rest.is_empty() {
            break;
        }

        let start = offset(source, rest);
        let (next, kind) = token(rest).map_err(|_| {
            let found = rest.chars().next().map(String::from).unwrap_or_default();
            lex_error(ctx, &format!("token starting with '{}'", found), start)
        })?;
        let end = offset(source, next);
        tokens.push(Token::new(kind, Span { start, end }, line));
        line += source[start..end].matches('\n').count();
        rest = next;
    }

    Ok(tokens)
}

// ============================================================================
// TOKEN PARSERS
// ============================================================================

fn trivia(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((multispace1, comment))))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('%'), not_line_ending))(input)
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((
        float,
        integer,
        char_literal,
        map(string_literal, TokenKind::Str),
        map(quoted_atom, TokenKind::Atom),
        variable,
        atom_or_reserved,
        dot,
        punctuation,
    ))(input)
}

fn float(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(tuple((
            digit1,
            char('.'),
            digit1,
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| text.parse::<f64>().map(TokenKind::Float),
    )(input)
}

fn integer(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        pair(
            digit1,
            opt(preceded(
                char('#'),
                take_while1(|c: char| c.is_ascii_alphanumeric()),
            )),
        ),
        |(digits, radix_digits): (&str, Option<&str>)| match radix_digits {
            Some(value) => {
                let radix = digits.parse::<u32>().map_err(|_| ())?;
                if !(2..=36).contains(&radix) {
                    return Err(());
                }
                i64::from_str_radix(value, radix)
                    .map(TokenKind::Integer)
                    .map_err(|_| ())
            }
            None => digits.parse::<i64>().map(TokenKind::Integer).map_err(|_| ()),
        },
    )(input)
}

fn char_literal(input: &str) -> IResult<&str, TokenKind> {
    map(
        preceded(char('$'), alt((preceded(char('\\'), map(anychar, escape)), anychar))),
        TokenKind::Char,
    )(input)
}

fn variable(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_uppercase() || c == '_'),
            take_while(is_name_char),
        )),
        |name: &str| TokenKind::Var(name.to_string()),
    )(input)
}

fn atom_or_reserved(input: &str) -> IResult<&str, TokenKind> {
    map(
        recognize(pair(
            satisfy(|c| c.is_ascii_lowercase()),
            take_while(|c| is_name_char(c) || c == '@'),
        )),
        |name: &str| {
            if RESERVED_WORDS.contains(&name) {
                TokenKind::Reserved(name.to_string())
            } else {
                TokenKind::Atom(name.to_string())
            }
        },
    )(input)
}

fn dot(input: &str) -> IResult<&str, TokenKind> {
    map(
        terminated(char('.'), peek(alt((multispace1, tag("%"), eof)))),
        |_| TokenKind::Dot,
    )(input)
}

fn punctuation(input: &str) -> IResult<&str, TokenKind> {
    for &p in PUNCTUATION {
        if let Some(rest) = input.strip_prefix(p) {
            return Ok((rest, TokenKind::Punct(p)));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

fn string_literal(input: &str) -> IResult<&str, String> {
    delimited_text(input, '"')
}

fn quoted_atom(input: &str) -> IResult<&str, String> {
    delimited_text(input, '\'')
}

/// Text between two `quote` characters with backslash escapes.
fn delimited_text(input: &str, quote: char) -> IResult<&str, String> {
    let (mut rest, _) = char(quote)(input)?;
    let mut text = String::new();
    loop {
        let (next, ch) = anychar(rest)?;
        if ch == quote {
            return Ok((next, text));
        }
        if ch == '\\' {
            let (next, escaped) = anychar(next)?;
            text.push(escape(escaped));
            rest = next;
            continue;
        }
        text.push(ch);
        rest = next;
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn escape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        's' => ' ',
        'e' => '\u{1b}',
        '0' => '\0',
        other => other,
    }
}

fn offset(source: &str, rest: &str) -> usize {
    source.len() - rest.len()
}

fn lex_error(ctx: &PhaseContext, construct: &str, at: usize) -> HdrError {
    ctx.report(
        ErrorKind::MalformedConstruct {
            construct: construct.to_string(),
        },
        to_source_span(Span { start: at, end: at }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let ctx = PhaseContext::new(SourceContext::from_file("t.hrl", src), "lex");
        tokenize(src, &ctx)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_define_directive() {
        assert_eq!(
            kinds("-define(SQ(N), N*N)."),
            vec![
                TokenKind::Punct("-"),
                TokenKind::Atom("define".into()),
                TokenKind::Punct("("),
                TokenKind::Var("SQ".into()),
                TokenKind::Punct("("),
                TokenKind::Var("N".into()),
                TokenKind::Punct(")"),
                TokenKind::Punct(","),
                TokenKind::Var("N".into()),
                TokenKind::Punct("*"),
                TokenKind::Var("N".into()),
                TokenKind::Punct(")"),
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("42 16#ff 1.5e3 $a $\\n \"hi\\n\" 'Quoted atom'"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Integer(255),
                TokenKind::Float(1500.0),
                TokenKind::Char('a'),
                TokenKind::Char('\n'),
                TokenKind::Str("hi\n".into()),
                TokenKind::Atom("Quoted atom".into()),
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("A =:= B =/= C =< D"),
            vec![
                TokenKind::Var("A".into()),
                TokenKind::Punct("=:="),
                TokenKind::Var("B".into()),
                TokenKind::Punct("=/="),
                TokenKind::Var("C".into()),
                TokenKind::Punct("=<"),
                TokenKind::Var("D".into()),
            ]
        );
    }

    #[test]
    fn test_reserved_words_and_comments() {
        assert_eq!(
            kinds("X div 2 % trailing comment\nbegin"),
            vec![
                TokenKind::Var("X".into()),
                TokenKind::Reserved("div".into()),
                TokenKind::Integer(2),
                TokenKind::Reserved("begin".into()),
            ]
        );
    }

    #[test]
    fn test_dot_versus_field_access() {
        assert_eq!(
            kinds("#r.f."),
            vec![
                TokenKind::Punct("#"),
                TokenKind::Atom("r".into()),
                TokenKind::Punct("."),
                TokenKind::Atom("f".into()),
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_line_numbers() {
        let src = "a.\n\nb.";
        let ctx = PhaseContext::new(SourceContext::from_file("t.hrl", src), "lex");
        let tokens = tokenize(src, &ctx).unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_unterminated_string_fails() {
        let src = "\"open";
        let ctx = PhaseContext::new(SourceContext::from_file("t.hrl", src), "lex");
        assert!(tokenize(src, &ctx).is_err());
    }
}
