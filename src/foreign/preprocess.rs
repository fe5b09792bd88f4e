//! Preprocessing service for foreign headers.
//!
//! [`Preprocessor`] is the two-call protocol the include loader speaks:
//! open a header, ask for its structural forms, then ask for the macro table
//! the forms left behind. [`HeaderPreprocessor`] is the built-in
//! implementation. It handles `-define`, `-undef`, `-record`, `-type`,
//! `-include` and the conditional directives, which it recognises and drops.

use log::{debug, trace, warn};
use std::fs;
use std::path::{Path, PathBuf};

use super::expr::ForeignNode;
use super::forms::{Form, FormError, RecordDecl, RecordField};
use super::lexer::tokenize;
use super::parser::parse_single_expr;
use super::table::{Arity, MacroDef, MacroTable};
use super::token::{render_tokens, Token, TokenKind};
use crate::ast::Span;
use crate::errors::{
    to_source_span, ErrorKind, ErrorReporting, HdrError, PhaseContext, SourceContext,
};

/// Nesting limit for `-include` inside headers.
pub const MAX_NESTED_INCLUDES: usize = 32;

/// Nesting limit for macro uses expanding into further macro uses.
pub const EXPANSION_LIMIT: usize = 128;

const CONDITIONAL_DIRECTIVES: &[&str] = &["ifdef", "ifndef", "if", "elif", "else", "endif"];

// ============================================================================
// SERVICE PROTOCOL
// ============================================================================

/// A preprocessing service.
///
/// `parse_forms` must be called before `macro_table`; the handle must be
/// released with `close` exactly once. [`crate::foreign::Session`] enforces
/// both rules.
pub trait Preprocessor {
    type Handle;

    fn open(&self, path: &Path) -> Result<Self::Handle, HdrError>;
    fn parse_forms(&self, handle: &mut Self::Handle) -> Result<Vec<Form>, HdrError>;
    fn macro_table(&self, handle: &mut Self::Handle) -> Result<MacroTable, HdrError>;
    fn close(&self, handle: Self::Handle);
}

#[derive(Debug, Clone)]
pub struct HeaderPreprocessor {
    include_paths: Vec<PathBuf>,
    max_include_depth: usize,
    expansion_limit: usize,
}

#[derive(Debug)]
pub struct HeaderHandle {
    path: PathBuf,
    source: String,
    table: Option<MacroTable>,
}

impl Default for HeaderPreprocessor {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            max_include_depth: MAX_NESTED_INCLUDES,
            expansion_limit: EXPANSION_LIMIT,
        }
    }
}

impl HeaderPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra directories searched by nested `-include` directives.
    pub fn with_include_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.include_paths = paths;
        self
    }

    pub fn with_expansion_limit(mut self, limit: usize) -> Self {
        self.expansion_limit = limit;
        self
    }
}

impl Preprocessor for HeaderPreprocessor {
    type Handle = HeaderHandle;

    fn open(&self, path: &Path) -> Result<HeaderHandle, HdrError> {
        let source = fs::read_to_string(path).map_err(|e| {
            HdrError::bare(
                ErrorKind::ReadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                },
                "preprocess",
            )
        })?;
        debug!("opened header {}", path.display());
        Ok(HeaderHandle {
            path: path.to_path_buf(),
            source,
            table: None,
        })
    }

    fn parse_forms(&self, handle: &mut HeaderHandle) -> Result<Vec<Form>, HdrError> {
        let mut reader = HeaderReader {
            service: self,
            table: MacroTable::with_predefined(),
            forms: Vec::new(),
        };
        reader.read_file(&handle.path, &handle.source, 0)?;
        debug!(
            "{}: {} forms, {} macro names",
            handle.path.display(),
            reader.forms.len(),
            reader.table.len()
        );
        handle.table = Some(reader.table);
        Ok(reader.forms)
    }

    fn macro_table(&self, handle: &mut HeaderHandle) -> Result<MacroTable, HdrError> {
        if handle.table.is_none() {
            self.parse_forms(handle)?;
        }
        Ok(handle.table.clone().unwrap_or_default())
    }

    fn close(&self, handle: HeaderHandle) {
        trace!("closed header {}", handle.path.display());
    }
}

// ============================================================================
// HEADER READER
// ============================================================================

struct HeaderReader<'s> {
    service: &'s HeaderPreprocessor,
    table: MacroTable,
    forms: Vec<Form>,
}

/// The file currently being read.
struct FileScope<'f> {
    path: &'f Path,
    ctx: PhaseContext,
    depth: usize,
}

impl FileScope<'_> {
    fn error_at(&self, kind: ErrorKind, token: &Token) -> HdrError {
        self.ctx.report(kind, to_source_span(token.span))
    }

    fn malformed(&self, construct: &str, token: &Token) -> HdrError {
        self.error_at(
            ErrorKind::MalformedConstruct {
                construct: construct.to_string(),
            },
            token,
        )
    }
}

impl HeaderReader<'_> {
    fn read_file(&mut self, path: &Path, source: &str, depth: usize) -> Result<(), HdrError> {
        let ctx = PhaseContext::new(
            SourceContext::from_file(path.display().to_string(), source),
            "preprocess",
        );
        let tokens = tokenize(source, &ctx)?;
        let scope = FileScope { path, ctx, depth };

        for (form, terminated) in split_forms(tokens) {
            let line = form.first().map(|t| t.line).unwrap_or_default();
            let result = if !terminated {
                Err(scope.malformed("form without terminating '.'", &form[form.len() - 1]))
            } else {
                self.read_form(&scope, &form)
            };
            if let Err(err) = result {
                debug!("{}:{}: {}", path.display(), line, err);
                self.forms.push(Form::Error(FormError {
                    line,
                    message: err.to_string(),
                }));
            }
        }
        Ok(())
    }

    fn read_form(&mut self, scope: &FileScope, tokens: &[Token]) -> Result<(), HdrError> {
        let first = &tokens[0];
        if !first.is_punct("-") {
            let form = function_form(scope, tokens)?;
            self.forms.push(form);
            return Ok(());
        }

        let name = match tokens.get(1).map(|t| &t.kind) {
            Some(TokenKind::Atom(name)) | Some(TokenKind::Reserved(name)) => name.as_str(),
            _ => return Err(scope.malformed("attribute name", first)),
        };
        let args = &tokens[2..];
        let line = first.line;

        match name {
            "define" => self.read_define(scope, first, args),
            "undef" => {
                let inner = parenthesized(scope, first, args)?;
                match inner.first().and_then(Token::name) {
                    Some(name) if inner.len() == 1 => {
                        self.table.undefine(name);
                        Ok(())
                    }
                    _ => Err(scope.malformed("-undef directive", first)),
                }
            }
            "record" => {
                let expanded = self.expand(scope, args, 0)?;
                let decl = read_record(scope, first, &expanded)?;
                self.forms.push(Form::Record(decl));
                Ok(())
            }
            "type" | "opaque" => {
                let name = args
                    .iter()
                    .find_map(|t| match &t.kind {
                        TokenKind::Atom(name) => Some(name.clone()),
                        _ => None,
                    })
                    .ok_or_else(|| scope.malformed("type declaration", first))?;
                self.forms.push(Form::TypeDecl { name, line });
                Ok(())
            }
            "include" | "include_lib" => self.read_include(scope, first, name, args),
            directive if CONDITIONAL_DIRECTIVES.contains(&directive) => {
                warn!(
                    "{}:{}: conditional directive -{} is not evaluated; dropped",
                    scope.path.display(),
                    line,
                    directive
                );
                Ok(())
            }
            other => {
                self.forms.push(Form::Attribute {
                    name: other.to_string(),
                    line,
                });
                Ok(())
            }
        }
    }

    fn read_define(
        &mut self,
        scope: &FileScope,
        dash: &Token,
        args: &[Token],
    ) -> Result<(), HdrError> {
        let inner = parenthesized(scope, dash, args)?;
        let Some((name_token, rest)) = inner.split_first() else {
            return Err(scope.ctx.missing_element("macro name", to_source_span(dash.span)));
        };
        let name = name_token
            .name()
            .ok_or_else(|| scope.malformed("macro name", name_token))?
            .to_string();

        let (arity, params, rest) = match rest.first() {
            Some(open) if open.is_punct("(") => {
                let close = matching_close(scope, rest, 0)?;
                let params = read_params(scope, &rest[1..close])?;
                (Arity::Fixed(params.len()), params, &rest[close + 1..])
            }
            _ => (Arity::None, Vec::new(), rest),
        };

        // `-define(FLAG).` defines FLAG as `true`
        let body = match rest.split_first() {
            None => vec![name_token.with_kind(TokenKind::Atom("true".to_string()))],
            Some((comma, body)) if comma.is_punct(",") => body.to_vec(),
            Some((other, _)) => return Err(scope.malformed("macro definition head", other)),
        };

        let def = MacroDef {
            params,
            body,
            line: dash.line,
        };
        if self.table.define(&name, arity, def) {
            warn!(
                "{}:{}: macro {}/{} redefined",
                scope.path.display(),
                dash.line,
                name,
                arity
            );
        }
        Ok(())
    }

    fn read_include(
        &mut self,
        scope: &FileScope,
        dash: &Token,
        directive: &str,
        args: &[Token],
    ) -> Result<(), HdrError> {
        let inner = parenthesized(scope, dash, args)?;
        let target = match inner {
            [Token {
                kind: TokenKind::Str(target),
                ..
            }] => target.as_str(),
            _ => return Err(scope.malformed("include directive", dash)),
        };

        let Some(path) = self.locate(scope.path, target) else {
            if directive == "include_lib" {
                warn!(
                    "{}:{}: library header {} not found; directive kept as attribute",
                    scope.path.display(),
                    dash.line,
                    target
                );
                self.forms.push(Form::Attribute {
                    name: directive.to_string(),
                    line: dash.line,
                });
                return Ok(());
            }
            return Err(scope.error_at(
                ErrorKind::ReadError {
                    path: target.to_string(),
                    reason: "file not found".to_string(),
                },
                dash,
            ));
        };

        if scope.depth + 1 > self.service.max_include_depth {
            return Err(scope.error_at(ErrorKind::RecursionLimit, dash));
        }

        let source = fs::read_to_string(&path).map_err(|e| {
            scope.error_at(
                ErrorKind::ReadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                },
                dash,
            )
        })?;
        debug!("{} includes {}", scope.path.display(), path.display());
        self.read_file(&path, &source, scope.depth + 1)
    }

    fn locate(&self, current: &Path, target: &str) -> Option<PathBuf> {
        let target = Path::new(target);
        if target.is_absolute() {
            return target.is_file().then(|| target.to_path_buf());
        }
        let base = current.parent().map(Path::to_path_buf).unwrap_or_default();
        std::iter::once(base)
            .chain(self.service.include_paths.iter().cloned())
            .map(|dir| dir.join(target))
            .find(|candidate| candidate.is_file())
    }

    // ------------------------------------------------------------------------
    // Macro expansion
    // ------------------------------------------------------------------------

    /// Replaces every `?NAME` and `?NAME(Args)` use in `tokens`.
    fn expand(
        &self,
        scope: &FileScope,
        tokens: &[Token],
        depth: usize,
    ) -> Result<Vec<Token>, HdrError> {
        if depth > self.service.expansion_limit {
            let at = tokens.first().map(|t| t.span).unwrap_or_default();
            return Err(scope.ctx.report(ErrorKind::RecursionLimit, to_source_span(at)));
        }

        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let question = &tokens[i];
            if !question.is_punct("?") {
                out.push(question.clone());
                i += 1;
                continue;
            }

            let name_token = tokens
                .get(i + 1)
                .ok_or_else(|| scope.malformed("macro use", question))?;
            if name_token.is_punct("?") {
                return Err(scope.error_at(
                    ErrorKind::Unsupported {
                        construct: "argument stringizing '??'".to_string(),
                    },
                    name_token,
                ));
            }
            let name = name_token
                .name()
                .ok_or_else(|| scope.malformed("macro use", name_token))?;

            if tokens.get(i + 2).is_some_and(|t| t.is_punct("(")) {
                let close = i + 2 + matching_close(scope, &tokens[i + 2..], 0)?;
                let arg_tokens = &tokens[i + 3..close];
                let call_args = if arg_tokens.is_empty() {
                    Vec::new()
                } else {
                    split_top_level(arg_tokens)
                };
                if let Some(def) = self.table.lookup(name, Arity::Fixed(call_args.len())) {
                    trace!("expanding ?{}/{}", name, call_args.len());
                    let body = substitute(&def.body, &def.params, &call_args);
                    out.extend(self.expand(scope, &body, depth + 1)?);
                    i = close + 1;
                    continue;
                }
            }

            if let Some(def) = self.table.lookup(name, Arity::None) {
                trace!("expanding ?{}", name);
                out.extend(self.expand(scope, &def.body, depth + 1)?);
            } else if self.table.is_predefined(name) {
                out.push(predefined_value(scope, name, question)?);
            } else {
                return Err(scope.error_at(
                    ErrorKind::UndefinedMacro {
                        name: name.to_string(),
                    },
                    name_token,
                ));
            }
            i += 2;
        }
        Ok(out)
    }
}

// ============================================================================
// FORM READERS
// ============================================================================

fn function_form(scope: &FileScope, tokens: &[Token]) -> Result<Form, HdrError> {
    let first = &tokens[0];
    match (&first.kind, tokens.get(1)) {
        (TokenKind::Atom(name), Some(open)) if open.is_punct("(") => {
            let close = matching_close(scope, tokens, 1)?;
            let params = &tokens[2..close];
            let arity = if params.is_empty() {
                0
            } else {
                split_top_level(params).len()
            };
            Ok(Form::Function {
                name: name.clone(),
                arity,
                line: first.line,
            })
        }
        _ => Err(scope.malformed("header form", first)),
    }
}

fn read_record(scope: &FileScope, dash: &Token, args: &[Token]) -> Result<RecordDecl, HdrError> {
    let inner = parenthesized(scope, dash, args)?;
    let parts = split_top_level(inner);
    let [name_part, body_part] = parts.as_slice() else {
        return Err(scope.malformed("record declaration", dash));
    };
    let name = match name_part {
        [Token {
            kind: TokenKind::Atom(name),
            ..
        }] => name.clone(),
        _ => return Err(scope.malformed("record name", dash)),
    };

    let body = match body_part {
        [open, inner @ .., close] if open.is_punct("{") && close.is_punct("}") => inner,
        _ => return Err(scope.malformed("record field list", dash)),
    };
    let fields = if body.is_empty() {
        Vec::new()
    } else {
        split_top_level(body)
            .iter()
            .map(|field| read_field(scope, dash, field))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(RecordDecl {
        name,
        fields,
        line: dash.line,
    })
}

fn read_field(scope: &FileScope, dash: &Token, tokens: &[Token]) -> Result<RecordField, HdrError> {
    let Some((name_token, rest)) = tokens.split_first() else {
        return Err(scope.malformed("empty record field", dash));
    };
    let name = match &name_token.kind {
        TokenKind::Atom(name) => name.clone(),
        _ => return Err(scope.malformed("record field name", name_token)),
    };

    let type_at = top_level_position(rest, "::");
    let (value_part, type_part) = match type_at {
        Some(at) => (&rest[..at], Some(&rest[at + 1..])),
        None => (rest, None),
    };

    let default: Option<ForeignNode> = match value_part.split_first() {
        None => None,
        Some((eq, expr)) if eq.is_punct("=") => Some(parse_single_expr(expr, &scope.ctx)?),
        Some((other, _)) => return Err(scope.malformed("record field default", other)),
    };

    Ok(RecordField {
        name,
        default,
        ty: type_part.map(render_tokens),
    })
}

fn read_params(scope: &FileScope, tokens: &[Token]) -> Result<Vec<String>, HdrError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(tokens)
        .into_iter()
        .map(|param| match param {
            [Token {
                kind: TokenKind::Var(name),
                ..
            }] => Ok(name.clone()),
            [token, ..] => Err(scope.malformed("macro parameter", token)),
            [] => Err(scope
                .ctx
                .missing_element("macro parameter", to_source_span(Span::default()))),
        })
        .collect()
}

fn predefined_value(scope: &FileScope, name: &str, at: &Token) -> Result<Token, HdrError> {
    let stem = scope
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = match name {
        "MODULE" => TokenKind::Atom(stem),
        "MODULE_STRING" => TokenKind::Str(stem),
        "FILE" => TokenKind::Str(scope.path.display().to_string()),
        "LINE" => TokenKind::Integer(at.line as i64),
        "MACHINE" => TokenKind::Atom("BEAM".to_string()),
        other => {
            return Err(scope.error_at(
                ErrorKind::Unsupported {
                    construct: format!("?{} outside a function", other),
                },
                at,
            ))
        }
    };
    Ok(at.with_kind(kind))
}

/// Body of a macro with every parameter variable replaced by its argument.
fn substitute(body: &[Token], params: &[String], args: &[&[Token]]) -> Vec<Token> {
    let mut out = Vec::with_capacity(body.len());
    for token in body {
        let arg = match &token.kind {
            TokenKind::Var(name) => params.iter().position(|p| p == name).map(|i| args[i]),
            _ => None,
        };
        match arg {
            Some(arg) => out.extend_from_slice(arg),
            None => out.push(token.clone()),
        }
    }
    out
}

// ============================================================================
// TOKEN UTILITIES
// ============================================================================

/// Splits a token stream at form terminators. The flag is `false` for a
/// trailing form that never reached its `.`.
fn split_forms(tokens: Vec<Token>) -> Vec<(Vec<Token>, bool)> {
    let mut forms = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token.kind == TokenKind::Dot {
            if !current.is_empty() {
                forms.push((std::mem::take(&mut current), true));
            }
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        forms.push((current, false));
    }
    forms
}

fn opens(token: &Token) -> bool {
    ["(", "[", "{", "<<"].iter().any(|p| token.is_punct(p))
}

fn closes(token: &Token) -> bool {
    [")", "]", "}", ">>"].iter().any(|p| token.is_punct(p))
}

/// Splits at commas outside any brackets. Always yields at least one part.
pub(crate) fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if opens(token) {
            depth += 1;
        } else if closes(token) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(",") {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

fn top_level_position(tokens: &[Token], punct: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if opens(token) {
            depth += 1;
        } else if closes(token) {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_punct(punct) {
            return Some(i);
        }
    }
    None
}

/// Index of the bracket closing the one at `open`.
fn matching_close(scope: &FileScope, tokens: &[Token], open: usize) -> Result<usize, HdrError> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if opens(token) {
            depth += 1;
        } else if closes(token) {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
    }
    Err(scope.malformed("brackets, no matching close", &tokens[open]))
}

/// The tokens between a leading `(` and the `)` that closes it, which must
/// end the slice.
fn parenthesized<'t>(
    scope: &FileScope,
    dash: &Token,
    tokens: &'t [Token],
) -> Result<&'t [Token], HdrError> {
    match tokens.first() {
        Some(open) if open.is_punct("(") => {
            let close = matching_close(scope, tokens, 0)?;
            if close + 1 != tokens.len() {
                return Err(scope.malformed("directive, tokens after ')'", &tokens[close + 1]));
            }
            Ok(&tokens[1..close])
        }
        _ => Err(scope.malformed("directive arguments", dash)),
    }
}
