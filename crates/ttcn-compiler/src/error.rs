//! Driver errors.
//!
//! These are failures to get a program into the checker at all. Problems
//! found by the checker are [`CompileError`](ttcn_resolve::CompileError)s
//! and travel inside a [`CheckReport`](crate::CheckReport).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The file is not a serialized program.
    #[error("{path} is not a valid program: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no program files found in {0}")]
    EmptyInput(PathBuf),
}
