//! The hdrlisp Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use clap::Parser;
use std::path::Path;
use std::process;

use crate::ast::builder::make_string;
use crate::ast::{AstNode, Span};
use crate::cli::args::{Command, HdrArgs};
use crate::config::Config;
use crate::errors::{print_error, HdrError};
use crate::foreign::{HeaderPreprocessor, MacroTable};
use crate::include::{loader, Directive, ExpandState, IncludeExpander};

pub mod args;
pub mod output;

/// What a subcommand produced.
enum Outcome {
    Forms {
        forms: Vec<AstNode>,
        state: ExpandState,
    },
    Macros(MacroTable),
}

/// The main entry point for the CLI.
pub fn run() {
    let args = HdrArgs::parse();
    init_logging(args.verbose);

    let config = build_config(&args).unwrap_or_else(|e| {
        print_error(e);
        process::exit(1);
    });

    let result = match &args.command {
        Command::Include { file } => {
            include(&config, Directive::IncludeFile, &file.display().to_string())
        }
        Command::IncludeLib { name } => include(&config, Directive::IncludeLib, name),
        Command::Expand { file } => expand(&config, file),
        Command::Macros { header } => macros(&config, header),
    };

    match result {
        Ok(outcome) => report(outcome, args.json),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

/// Installs `env_logger`; `RUST_LOG` overrides the level derived from `-v`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn build_config(args: &HdrArgs) -> Result<Config, HdrError> {
    let mut config = Config::load(args.config.as_deref())?;
    config.include_paths.extend(args.include_paths.iter().cloned());
    config.lib_dirs.extend(args.lib_dirs.iter().cloned());
    Ok(config)
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn include(config: &Config, directive: Directive, target: &str) -> Result<Outcome, HdrError> {
    let expander = IncludeExpander::from_config(config.clone());
    let args = [make_string(target.to_string(), Span::default())];
    let expanded = expander.expand_directive(directive, &args, ExpandState::new())?;
    Ok(Outcome::Forms {
        forms: vec![expanded.form],
        state: expanded.state,
    })
}

fn expand(config: &Config, file: &Path) -> Result<Outcome, HdrError> {
    let expander = IncludeExpander::from_config(config.clone());
    let forms = loader::load_native(file)?;
    let (forms, state) = expander.expand_program(forms, ExpandState::for_file(file))?;
    Ok(Outcome::Forms { forms, state })
}

fn macros(config: &Config, header: &Path) -> Result<Outcome, HdrError> {
    let service = HeaderPreprocessor::new().with_include_paths(config.include_paths.clone());
    let (_, table) = loader::load_foreign(&service, header)?;
    Ok(Outcome::Macros(table))
}

// ============================================================================
// OUTPUT
// ============================================================================

fn report(outcome: Outcome, json: bool) {
    match outcome {
        Outcome::Forms { forms, state } => {
            if json {
                output::print_forms_json(&forms, &state.included, &state.warnings);
            } else {
                output::print_forms(&forms);
            }
            output::print_summary(state.included.len(), state.warnings.len());
            for warning in state.warnings {
                print_error(warning);
            }
        }
        Outcome::Macros(table) => {
            if json {
                output::print_macro_table_json(&table);
            } else {
                output::print_macro_table(&table);
            }
        }
    }
}
