// tests/include_tests.rs

mod common;

use common::Fixture;
use hdrlisp::ast::builder::make_string;
use hdrlisp::errors::{ErrorCategory, SourceContext};
use hdrlisp::include::{LibDirs, SourceKind};
use hdrlisp::syntax::parser::parse;
use hdrlisp::{Config, Directive, Expr, ErrorKind, ExpandState, Expanded, HdrError, IncludeExpander, Span};

fn include(
    expander: &IncludeExpander,
    directive: Directive,
    target: &str,
) -> Result<Expanded, HdrError> {
    let args = [make_string(target.to_string(), Span::default())];
    expander.expand_directive(directive, &args, ExpandState::new())
}

fn default_expander() -> IncludeExpander {
    IncludeExpander::from_config(Config::default())
}

#[test]
fn test_point_header_end_to_end() {
    let fx = Fixture::new();
    let header = fx.file(
        "point.hrl",
        "%% points\n-record(point, {x, y = 0}).\n-define(SQ(N), N*N).\n",
    );
    let expanded = include(
        &default_expander(),
        Directive::IncludeFile,
        &header.display().to_string(),
    )
    .unwrap();
    assert_eq!(
        expanded.form.value.pretty(),
        "(progn (defrecord point x (y 0)) (defmacro SQ ((N) `(* ,N ,N))))"
    );
}

/// Structural equality that ignores spans.
fn same_tree(a: &Expr, b: &Expr) -> bool {
    match (a, b) {
        (Expr::List(xs), Expr::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_tree(&x.value, &y.value))
        }
        (Expr::Quote(x), Expr::Quote(y))
        | (Expr::Backquote(x), Expr::Backquote(y))
        | (Expr::Comma(x), Expr::Comma(y))
        | (Expr::CommaAt(x), Expr::CommaAt(y)) => same_tree(&x.value, &y.value),
        _ => a == b,
    }
}

#[test]
fn test_output_reads_back_with_native_reader() {
    let fx = Fixture::new();
    let header = fx.file(
        "misc.hrl",
        concat!(
            "-define(PAIR(A, B), {A, [B | tail]}).\n",
            "-define(NAME, \"n\").\n",
            "-record(r, {a = -1, b = {x, 1.5}}).\n",
            "-define(SPACED, 'hello world').\n",
            "-define(DIGITS, '42').\n",
            "-define(BIG, 1.0e20).\n",
            "-define(BARRED, 'a|b').\n",
        ),
    );
    let expanded = include(
        &default_expander(),
        Directive::IncludeFile,
        &header.display().to_string(),
    )
    .unwrap();
    let text = expanded.form.value.pretty();
    assert!(text.contains("`'|hello world|"));
    assert!(text.contains("`'|42|"));
    assert!(text.contains("`1.0e20"));

    let reread = parse(&text, SourceContext::from_file("out", text.as_str())).unwrap();
    assert_eq!(reread.len(), 1);
    assert_eq!(reread[0].value.pretty(), text);
    assert!(same_tree(&reread[0].value, &expanded.form.value));
}

#[test]
fn test_clause_order_and_skips() {
    let fx = Fixture::new();
    let header = fx.file(
        "m.hrl",
        concat!(
            "-define(M, default).\n",
            "-define(M(X), {one, X}).\n",
            "-define(M(X, Y), X, Y).\n",
            "-define(ONLY_BAD(A), A, A).\n",
        ),
    );
    let expanded = include(
        &default_expander(),
        Directive::IncludeFile,
        &header.display().to_string(),
    )
    .unwrap();
    assert_eq!(
        expanded.form.value.pretty(),
        "(progn (defmacro M ((X) `(tuple 'one ,X)) ((_) `'default)))"
    );
    assert!(expanded.state.warnings.is_empty());
}

#[test]
fn test_definition_failures_become_warnings() {
    let fx = Fixture::new();
    let header = fx.file(
        "w.hrl",
        concat!(
            "-record(ok_rec, {a}).\n",
            "-record(bad_rec, {a = ?MISSING}).\n",
            "-define(BAD, case x of _ -> 1 end).\n",
            "-ifdef(TEST).\n",
            "-endif.\n",
        ),
    );
    let expanded = include(
        &default_expander(),
        Directive::IncludeFile,
        &header.display().to_string(),
    )
    .unwrap();
    assert_eq!(expanded.form.value.pretty(), "(progn (defrecord ok_rec a))");

    let warnings = &expanded.state.warnings;
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.is_warning()));
    assert!(warnings
        .iter()
        .all(|w| w.category() == ErrorCategory::Definition));
    assert!(warnings
        .iter()
        .any(|w| w.to_string().starts_with("unable to translate macro `BAD`")));
}

#[test]
fn test_include_lib_through_lib_dirs() {
    let fx = Fixture::new();
    fx.file("libs/app-1.0/include/app.hrl", "-define(VSN, 1).\n");
    fx.file("libs/app-1.2/include/app.hrl", "-define(VSN, 2).\n");
    let config = Config {
        lib_dirs: vec![fx.root().join("libs")],
        ..Config::default()
    };
    let expander = IncludeExpander::from_config(config);

    let expanded = include(&expander, Directive::IncludeLib, "app/include/app.hrl").unwrap();
    assert_eq!(
        expanded.form.value.pretty(),
        "(progn (defmacro VSN ((_) `2)))"
    );
    assert!(expanded.state.included[0].ends_with("app-1.2/include/app.hrl"));

    let err = include(&expander, Directive::IncludeLib, "nope/include/x.hrl").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::BadArgument { .. }));
}

#[test]
fn test_injected_library_roots() {
    let fx = Fixture::new();
    fx.file("custom/include/c.hrl", "-record(c, {v = ok}).\n");
    let root = fx.root().join("custom");
    let roots = move |lib: &str| (lib == "custom").then(|| root.clone());
    let expander = IncludeExpander::new(
        Config::default(),
        roots,
        hdrlisp::foreign::HeaderPreprocessor::new(),
    );
    let args = [make_string("custom/include/c.hrl".into(), Span::default())];
    let expanded = expander
        .expand_directive(Directive::IncludeLib, &args, ExpandState::new())
        .unwrap();
    assert_eq!(expanded.form.value.pretty(), "(progn (defrecord c (v 'ok)))");
}

#[test]
fn test_missing_file_is_request_error() {
    let err = include(&default_expander(), Directive::IncludeFile, "/no/such/file.hrl").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReadError { .. }));
    assert_eq!(err.category(), ErrorCategory::Request);
}

#[test]
fn test_expand_program_splices_directives() {
    let fx = Fixture::new();
    fx.file("inc/defs.hrl", "-define(ANSWER, 42).\n");
    let main = fx.file(
        "main.lfe",
        "(include-file \"defs.hrl\")\n(defun answer () (ANSWER))\n",
    );
    let config = Config {
        include_paths: vec![fx.root().join("inc")],
        ..Config::default()
    };
    let expander = IncludeExpander::from_config(config);
    let forms = hdrlisp::include::loader::load_native(&main).unwrap();
    let (forms, state) = expander
        .expand_program(forms, ExpandState::for_file(&main))
        .unwrap();
    let rendered: Vec<_> = forms.iter().map(|f| f.value.pretty()).collect();
    assert_eq!(
        rendered,
        vec![
            "(progn (defmacro ANSWER ((_) `42)))",
            "(defun answer () (ANSWER))"
        ]
    );
    assert_eq!(state.included.len(), 1);
}

#[test]
fn test_classification_follows_config() {
    let config = Config {
        foreign_suffixes: vec!["hrl".into(), "h".into()],
        ..Config::default()
    };
    assert_eq!(
        hdrlisp::include::resolver::classify(std::path::Path::new("x.h"), &config),
        SourceKind::Foreign
    );
    let _ = LibDirs::from_config(&config);
}
