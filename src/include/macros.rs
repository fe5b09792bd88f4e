//! Macro definitions to multi-clause `defmacro` forms.
//!
//! Each definition of a macro name becomes one clause `(pattern template)`.
//! The pattern binds the formal parameters; the template is the converted
//! body under a backquote, with parameter references as `,Param`
//! substitution points and everything else reproduced literally.
//!
//! Clause order follows the definition table except that the object-style
//! definition, if any, always comes last. Its pattern is `(_)`, which also
//! accepts a single argument; a zero-parameter function-style definition
//! gets `()` instead. A body that is not exactly one expression produces no
//! clause.

use log::{debug, trace, warn};
use std::path::Path;

use super::records::header_context;
use crate::ast::builder::{make_backquote, make_call, make_list, make_symbol};
use crate::ast::{AstNode, Span};
use crate::errors::{unspanned, ErrorKind, ErrorReporting, HdrError, PhaseContext};
use crate::foreign::convert::expr_to_native;
use crate::foreign::parser::parse_exprs;
use crate::foreign::token::render_tokens;
use crate::foreign::{Arity, MacroDef, MacroEntry, MacroTable, Token, TokenKind};

// ============================================================================
// TOKEN PASSES
// ============================================================================

/// Rewrites macro uses into plain calls: `?Name(` becomes `Name(` and a bare
/// `?Name` becomes `Name()`. `Name` is always an atom afterwards, however it
/// was spelled.
pub fn normalize_macro_refs(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        let used_name = match iter.peek() {
            Some(next) if token.is_punct("?") => next.name().map(str::to_string),
            _ => None,
        };
        let Some(name) = used_name else {
            out.push(token);
            continue;
        };
        let Some(name_token) = iter.next() else {
            break;
        };
        out.push(name_token.with_kind(TokenKind::Atom(name)));
        if !iter.peek().is_some_and(|next| next.is_punct("(")) {
            out.push(name_token.with_kind(TokenKind::Punct("(")));
            out.push(name_token.with_kind(TokenKind::Punct(")")));
        }
    }

    trace!("normalized: {}", render_tokens(&out));
    out
}

/// Marks every variable naming a formal parameter for substitution.
pub fn capture_args(tokens: Vec<Token>, params: &[String]) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|token| {
            let captured = match &token.kind {
                TokenKind::Var(name) if params.contains(name) => Some(name.clone()),
                _ => None,
            };
            match captured {
                Some(name) => token.with_kind(TokenKind::Unquote(name)),
                None => token,
            }
        })
        .collect()
}

// ============================================================================
// CLAUSES
// ============================================================================

/// Definitions in clause order: table order with the object-style
/// definition moved to the end.
pub fn ordered_definitions(defs: &[(Arity, MacroDef)]) -> Vec<&(Arity, MacroDef)> {
    let (mut ordered, object_style): (Vec<_>, Vec<_>) =
        defs.iter().partition(|(arity, _)| *arity != Arity::None);
    ordered.extend(object_style);
    ordered
}

/// `(P1 ... Pn)` for a function-style definition, `(_)` for an object-style one.
pub fn clause_pattern(arity: Arity, params: &[String], span: Span) -> AstNode {
    let items = match arity {
        Arity::None => vec![make_symbol("_", span)],
        Arity::Fixed(_) => params.iter().map(|p| make_symbol(p, span)).collect(),
    };
    make_list(items, span)
}

/// Translates one definition into a `(pattern template)` clause.
///
/// Returns `Ok(None)` when the body is not a single expression.
pub fn translate_clause(
    arity: Arity,
    def: &MacroDef,
    ctx: &PhaseContext,
) -> Result<Option<AstNode>, HdrError> {
    let span = Span::default();
    let tokens = capture_args(normalize_macro_refs(def.body.clone()), &def.params);
    let mut exprs = parse_exprs(&tokens, ctx)?;
    if exprs.len() != 1 {
        return Ok(None);
    }
    let body = expr_to_native(&exprs.remove(0), ctx)?;
    let pattern = clause_pattern(arity, &def.params, span);
    Ok(Some(make_list(vec![pattern, make_backquote(body, span)], span)))
}

/// Translates every definition of `name` into one `defmacro` form.
///
/// Each clause that fails outright adds a `MacroTranslation` warning, whether
/// or not other clauses survive. `None` means no clause survived.
pub fn translate_macro(
    name: &str,
    defs: &[(Arity, MacroDef)],
    ctx: &PhaseContext,
    warnings: &mut Vec<HdrError>,
) -> Option<AstNode> {
    let span = Span::default();
    let mut clauses = Vec::new();

    for (arity, def) in ordered_definitions(defs) {
        match translate_clause(*arity, def, ctx) {
            Ok(Some(clause)) => clauses.push(clause),
            Ok(None) => debug!("{}/{}: body is not a single expression, skipped", name, arity),
            Err(err) => {
                let failure = ctx.report(
                    ErrorKind::MacroTranslation {
                        macro_name: name.to_string(),
                        reason: format!("{}/{} at line {}: {}", name, arity, def.line, err),
                    },
                    unspanned(),
                );
                warnings.push(failure.into_warning());
            }
        }
    }

    if clauses.is_empty() {
        return None;
    }
    let mut items = vec![make_symbol(name, span)];
    items.extend(clauses);
    Some(make_call("defmacro", items, span))
}

/// Translates the whole table in table order. Undefined and predefined names
/// are skipped; failures are reported in `warnings`.
pub fn translate_macros(
    table: &MacroTable,
    header: &Path,
    warnings: &mut Vec<HdrError>,
) -> Vec<AstNode> {
    let ctx = header_context(header, "macros");
    let mut macros = Vec::new();

    for (name, entry) in table.iter() {
        let MacroEntry::Defined(defs) = entry else {
            continue;
        };
        let reported = warnings.len();
        if let Some(form) = translate_macro(name, defs, &ctx, warnings) {
            macros.push(form);
        }
        for failure in &warnings[reported..] {
            warn!("{}: {}", header.display(), failure);
        }
    }
    macros
}
