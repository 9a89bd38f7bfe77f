//! Error types for kernel configuration generation.
//!
//! Every failure is fatal: nothing is retried and no partial result is kept.
//! [`Error::kind`] groups the variants into the four classes the CLI reports.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something outside the input files is wrong: missing directories,
    /// missing settings, a failing generator, an I/O error.
    Environment,
    /// An input file exists but does not have the expected shape.
    MalformedInput,
    /// An `[options]` line starts with an unknown action.
    UnknownDirective,
    /// A `set` operand has no `=`.
    MalformedSetOperand,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{} does not look like a kernel source directory (no readable Makefile)", .path.display())]
    KernelTreeNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("kernel Makefile {} does not contain proper version information: missing {field}", .path.display())]
    MalformedMakefile { path: PathBuf, field: &'static str },

    #[error("settings file not found ({name})\nSearched:\n{}", format_searched(.searched))]
    SettingsNotFound { name: String, searched: Vec<PathBuf> },

    #[error("invalid settings file {}: {reason}", .path.display())]
    InvalidSettings { path: PathBuf, reason: String },

    #[error("unknown directive '{action}' in line '{line}' (expected enable, disable, module or set)")]
    UnknownDirective { action: String, line: String },

    #[error("invalid option name '{name}' (expected letters, digits and '_')")]
    InvalidOptionName { name: String },

    #[error("malformed set operand '{operand}' (expected KEY=VALUE)")]
    MalformedSetOperand { operand: String },

    #[error("config source script '{script}' not found\nSearched:\n{}", format_searched(.searched))]
    GeneratorNotFound { script: String, searched: Vec<PathBuf> },

    #[error("config source script {} failed: {reason}", .script.display())]
    GeneratorFailed { script: PathBuf, reason: String },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::KernelTreeNotFound { .. }
            | Error::SettingsNotFound { .. }
            | Error::GeneratorNotFound { .. }
            | Error::GeneratorFailed { .. }
            | Error::Io { .. } => ErrorKind::Environment,
            Error::MalformedMakefile { .. }
            | Error::InvalidSettings { .. }
            | Error::InvalidOptionName { .. } => ErrorKind::MalformedInput,
            Error::UnknownDirective { .. } => ErrorKind::UnknownDirective,
            Error::MalformedSetOperand { .. } => ErrorKind::MalformedSetOperand,
        }
    }

    /// Wrap an I/O error with the operation and path it happened on.
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
