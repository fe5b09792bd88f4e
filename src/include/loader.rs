//! Loading resolved include targets.

use log::debug;
use std::fs;
use std::path::Path;

use crate::ast::AstNode;
use crate::errors::{ErrorKind, HdrError, SourceContext};
use crate::foreign::{Form, MacroTable, Preprocessor, Session};
use crate::syntax::parser;

/// Reads and parses a native source file.
pub fn load_native(path: &Path) -> Result<Vec<AstNode>, HdrError> {
    let source = fs::read_to_string(path).map_err(|e| read_error(path, e.to_string()))?;
    let context = SourceContext::from_file(path.display().to_string(), source.as_str());
    parser::parse(&source, context).map_err(|e| wrap(path, e))
}

/// Runs the preprocessing protocol on a foreign header.
pub fn load_foreign<P: Preprocessor>(
    service: &P,
    path: &Path,
) -> Result<(Vec<Form>, MacroTable), HdrError> {
    let session = Session::open(service, path).map_err(|e| wrap(path, e))?;
    let (forms, mut parsed) = session.parse().map_err(|e| wrap(path, e))?;
    let table = parsed.macro_table().map_err(|e| wrap(path, e))?;
    debug!(
        "{}: {} forms, {} macros",
        parsed.path().display(),
        forms.len(),
        table.len()
    );
    Ok((forms, table))
}

fn read_error(path: &Path, reason: String) -> HdrError {
    HdrError::bare(
        ErrorKind::ReadError {
            path: path.display().to_string(),
            reason,
        },
        "include",
    )
}

/// Any failure while loading is reported as a read error on the include
/// target, keeping the underlying diagnostic's help text.
fn wrap(path: &Path, err: HdrError) -> HdrError {
    if matches!(err.kind, ErrorKind::ReadError { .. }) {
        return err;
    }
    let help = err.diagnostic_info.help.clone();
    let wrapped = read_error(path, err.to_string());
    match help {
        Some(help) => wrapped.with_help(help),
        None => wrapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::HeaderPreprocessor;
    use std::fs;

    #[test]
    fn test_load_native() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.lfe");
        fs::write(&path, "(defun f () 1) (f)").unwrap();
        assert_eq!(load_native(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_native_parse_failure_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.lfe");
        fs::write(&path, "(unclosed").unwrap();
        let err = load_native(&path).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ReadError { .. }));
    }

    #[test]
    fn test_load_foreign() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.hrl");
        fs::write(&path, "-record(r, {a}).\n-define(M, 1).").unwrap();
        let (forms, table) = load_foreign(&HeaderPreprocessor::new(), &path).unwrap();
        assert_eq!(forms.len(), 1);
        assert!(table.get("M").is_some());
    }

    #[test]
    fn test_missing_header_is_read_error() {
        let err = load_foreign(&HeaderPreprocessor::new(), Path::new("/no/such.hrl")).unwrap_err();
        assert_eq!(err.diagnostic_info.error_code, "hdrlisp::preprocess::read_error");
    }

    #[test]
    fn test_unlexable_header_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.hrl");
        fs::write(&path, "-define(S, \"open).").unwrap();
        let err = load_foreign(&HeaderPreprocessor::new(), &path).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ReadError { .. }));
    }
}
