//! Record declarations to `defrecord` forms.

use log::{debug, warn};
use std::path::Path;

use crate::ast::builder::{make_call, make_list, make_symbol};
use crate::ast::{AstNode, Span};
use crate::errors::{unspanned, ErrorKind, ErrorReporting, HdrError, PhaseContext, SourceContext};
use crate::foreign::convert::expr_to_native;
use crate::foreign::{Form, RecordDecl};

/// Translates every record in `forms`, in order.
///
/// Records whose defaults cannot be converted and forms the preprocessor
/// flagged as errors are left out and reported in `warnings`.
pub fn translate_records(
    forms: &[Form],
    header: &Path,
    warnings: &mut Vec<HdrError>,
) -> Vec<AstNode> {
    let ctx = header_context(header, "records");
    let mut records = Vec::new();

    for form in forms {
        match form {
            Form::Record(decl) => match translate_record(decl, &ctx) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!("{}: {}", header.display(), err);
                    warnings.push(err.into_warning());
                }
            },
            Form::Error(err) => {
                let dropped = ctx
                    .report(
                        ErrorKind::DroppedForm {
                            description: format!("line {}: {}", err.line, err.message),
                        },
                        unspanned(),
                    )
                    .into_warning();
                warn!("{}: {}", header.display(), dropped);
                warnings.push(dropped);
            }
            Form::Function { .. } | Form::TypeDecl { .. } | Form::Attribute { .. } => {
                debug!("{}:{}: skipping {}", header.display(), form.line(), form);
            }
        }
    }
    records
}

/// `(defrecord name field (field default) ...)`
pub fn translate_record(decl: &RecordDecl, ctx: &PhaseContext) -> Result<AstNode, HdrError> {
    let span = Span::default();
    let mut items = vec![make_symbol(&decl.name, span)];

    for field in &decl.fields {
        let name = make_symbol(&field.name, span);
        match &field.default {
            None => items.push(name),
            Some(default) => {
                let value = expr_to_native(default, ctx).map_err(|err| {
                    ctx.report(
                        ErrorKind::RecordTranslation {
                            record: decl.name.clone(),
                            reason: format!("line {}, field `{}`: {}", decl.line, field.name, err),
                        },
                        unspanned(),
                    )
                })?;
                items.push(make_list(vec![name, value], span));
            }
        }
    }

    Ok(make_call("defrecord", items, span))
}

/// Diagnostic context naming the header; translation errors carry line
/// numbers in their text instead of spans.
pub(crate) fn header_context(header: &Path, phase: &str) -> PhaseContext {
    PhaseContext::new(
        SourceContext::from_file(header.display().to_string(), String::new()),
        phase,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::expr::{node, ForeignExpr};
    use crate::foreign::{FormError, RecordField};

    fn field(name: &str, default: Option<ForeignExpr>) -> RecordField {
        RecordField {
            name: name.into(),
            default: default.map(|d| node(d, Span::default())),
            ty: None,
        }
    }

    fn record(name: &str, fields: Vec<RecordField>) -> Form {
        Form::Record(RecordDecl {
            name: name.into(),
            fields,
            line: 1,
        })
    }

    #[test]
    fn test_field_order_and_defaults() {
        let forms = vec![record(
            "r",
            vec![
                field("f1", None),
                field("f2", Some(ForeignExpr::Atom("d2".into()))),
                field("f3", None),
            ],
        )];
        let mut warnings = Vec::new();
        let out = translate_records(&forms, Path::new("r.hrl"), &mut warnings);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value.pretty(), "(defrecord r f1 (f2 'd2) f3)");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_untranslatable_record_is_omitted_with_warning() {
        let bad_default = ForeignExpr::BinaryOp {
            op: "=".into(),
            lhs: Box::new(node(ForeignExpr::Var("X".into()), Span::default())),
            rhs: Box::new(node(ForeignExpr::Integer(1), Span::default())),
        };
        let forms = vec![
            record("bad", vec![field("a", Some(bad_default))]),
            record("good", vec![field("a", None)]),
        ];
        let mut warnings = Vec::new();
        let out = translate_records(&forms, Path::new("r.hrl"), &mut warnings);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value.pretty(), "(defrecord good a)");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].is_warning());
        assert!(warnings[0]
            .to_string()
            .starts_with("unable to translate record `bad`"));
    }

    #[test]
    fn test_non_record_forms_dropped_and_errors_reported() {
        let forms = vec![
            Form::Function {
                name: "f".into(),
                arity: 0,
                line: 1,
            },
            Form::Error(FormError {
                line: 3,
                message: "malformed header form".into(),
            }),
        ];
        let mut warnings = Vec::new();
        let out = translate_records(&forms, Path::new("r.hrl"), &mut warnings);
        assert!(out.is_empty());
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].diagnostic_info.error_code,
            "hdrlisp::records::dropped_form"
        );
    }
}
