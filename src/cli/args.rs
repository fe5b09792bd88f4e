//! Defines the command-line arguments and subcommands for the hdrlisp CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "hdrlisp",
    version,
    about = "Imports foreign header records and macros as native defrecord and defmacro forms."
)]
pub struct HdrArgs {
    /// Extra directory searched for relative include targets.
    #[arg(short = 'I', long = "include-path", global = true)]
    pub include_paths: Vec<PathBuf>,

    /// Directory holding `<lib>` or `<lib>-<version>` library roots.
    #[arg(short = 'L', long = "lib-dir", global = true)]
    pub lib_dirs: Vec<PathBuf>,

    /// Configuration file; defaults to ./hdrlisp.yaml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Translate a file as `(include-file "FILE")` would.
    Include {
        /// Header or native file to include.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Translate a library file as `(include-lib "LIB/PATH")` would.
    IncludeLib {
        /// Path whose first segment names the library.
        #[arg(required = true)]
        name: String,
    },
    /// Expand every include directive in a native source file.
    Expand {
        /// The native source file to expand.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// List the macro table a header defines.
    Macros {
        /// The header to preprocess.
        #[arg(required = true)]
        header: PathBuf,
    },
}
