//! Handles all user-facing output for the CLI.
//!
//! Translated forms and macro listings go to stdout, as text or JSON. The
//! summary and every diagnostic go to stderr.

use serde_json::{json, Value};
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::AstNode;
use crate::errors::HdrError;
use crate::foreign::{MacroEntry, MacroTable};

// ============================================================================
// FORMS
// ============================================================================

pub fn print_forms(forms: &[AstNode]) {
    for form in forms {
        println!("{}", form.value.pretty());
    }
}

pub fn print_forms_json(forms: &[AstNode], included: &[PathBuf], warnings: &[HdrError]) {
    let value = json!({
        "forms": forms.iter().map(|f| f.value.pretty()).collect::<Vec<_>>(),
        "ast": forms,
        "included": included,
        "warnings": warnings.iter().map(warning_json).collect::<Vec<_>>(),
    });
    print_json(&value);
}

fn warning_json(warning: &HdrError) -> Value {
    json!({
        "code": warning.diagnostic_info.error_code,
        "message": warning.to_string(),
    })
}

// ============================================================================
// MACRO TABLES
// ============================================================================

pub fn print_macro_table(table: &MacroTable) {
    let mut stdout = StandardStream::stdout(color_choice(std::io::stdout().is_terminal()));
    for (name, entry) in table.iter() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
        let _ = write!(stdout, "{}", name);
        let _ = stdout.reset();
        let _ = writeln!(stdout, " {}", describe_entry(entry));
    }
}

pub fn print_macro_table_json(table: &MacroTable) {
    let entries: Vec<Value> = table
        .iter()
        .map(|(name, entry)| json!({ "name": name, "entry": describe_entry(entry) }))
        .collect();
    print_json(&Value::Array(entries));
}

fn describe_entry(entry: &MacroEntry) -> String {
    match entry {
        MacroEntry::Undefined => "(undefined)".to_string(),
        MacroEntry::Predefined => "(predefined)".to_string(),
        MacroEntry::Defined(defs) => defs
            .iter()
            .map(|(arity, def)| format!("/{} line {}", arity, def.line))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// One-line summary on stderr: yellow when there were warnings.
pub fn print_summary(included: usize, warnings: usize) {
    let mut stderr = StandardStream::stderr(color_choice(std::io::stderr().is_terminal()));
    let color = if warnings > 0 { Color::Yellow } else { Color::Cyan };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)));
    let _ = writeln!(
        stderr,
        "{} file(s) included, {} warning(s)",
        included, warnings
    );
    let _ = stderr.reset();
}

fn color_choice(terminal: bool) -> ColorChoice {
    if terminal {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("failed to render JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::{Arity, MacroDef};

    #[test]
    fn test_describe_entry() {
        let def = MacroDef {
            params: vec![],
            body: vec![],
            line: 4,
        };
        let entry = MacroEntry::Defined(vec![(Arity::None, def.clone()), (Arity::Fixed(2), def)]);
        assert_eq!(describe_entry(&entry), "/none line 4, /2 line 4");
        assert_eq!(describe_entry(&MacroEntry::Predefined), "(predefined)");
    }
}
