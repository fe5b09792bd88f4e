//! Wrapping translated forms into the single form that replaces a directive.

use crate::ast::builder::{calculate_span, make_call};
use crate::ast::AstNode;

/// `(progn records... macros...)`
pub fn assemble(records: Vec<AstNode>, macros: Vec<AstNode>) -> AstNode {
    let mut forms = records;
    forms.extend(macros);
    assemble_native(forms)
}

/// `(progn forms...)`
pub fn assemble_native(forms: Vec<AstNode>) -> AstNode {
    let span = calculate_span(&forms);
    make_call("progn", forms, span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builder::make_symbol;
    use crate::ast::Span;

    #[test]
    fn test_records_precede_macros() {
        let span = Span::default();
        let form = assemble(vec![make_symbol("r", span)], vec![make_symbol("m", span)]);
        assert_eq!(form.value.pretty(), "(progn r m)");
    }

    #[test]
    fn test_empty_header() {
        assert_eq!(assemble(vec![], vec![]).value.pretty(), "(progn)");
    }
}
