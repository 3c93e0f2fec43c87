//! Settings errors.

use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Result alias for the settings crate.
pub type Result<T> = StdResult<T, Error>;

/// ` <path>` when a path is known.
fn at(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

/// Errors from loading or writing settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The settings file could not be read.
    #[error("cannot read settings{}: {message}", at(.path))]
    Read {
        /// File, when loading from disk.
        path: Option<PathBuf>,
        /// OS error text.
        message: String,
    },

    /// The settings document is malformed.
    #[error("settings{} line {line}, column {col}: {message}", at(.path))]
    Parse {
        /// File, when loading from disk.
        path: Option<PathBuf>,
        /// 1-based line.
        line: usize,
        /// 1-based column.
        col: usize,
        /// Parser message.
        message: String,
    },

    /// A `^…$` scope is not a valid regular expression.
    #[error("invalid scope pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}
