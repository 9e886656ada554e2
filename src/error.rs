//! Error types for med-sweep
//!
//! Every variant names the file, column or equation involved so a failed
//! experiment in a long sweep can be diagnosed from the report alone.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// med-sweep error types
#[derive(Error, Debug)]
pub enum Error {
    /// Requested columns are absent from the dataset
    #[error("Validation failed: columns not found in dataset: {missing:?}\nAvailable columns: {available:?}")]
    Validation {
        /// Names that were requested but not found
        missing: Vec<String>,
        /// Columns the dataset actually has
        available: Vec<String>,
    },

    /// Argument outside its accepted domain
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Discovery produced no locatable hall-of-fame table
    #[error("Equation artifact missing: {0}\nThe discovery backend did not produce a hall-of-fame table")]
    ArtifactMissing(String),

    /// Equation text could not be compiled
    #[error("Equation parse error at byte {position} in {equation:?}: {message}")]
    EquationParse {
        /// Original equation text
        equation: String,
        /// What went wrong
        message: String,
        /// Byte offset of the offending token
        position: usize,
    },

    /// Compiled equation called with the wrong number of arguments
    #[error("Equation expects {expected} arguments, got {actual}")]
    Arity {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// External discovery backend failed
    #[error("Discovery backend failed: {0}")]
    Backend(String),

    /// External discovery backend exceeded its timeout
    #[error("Discovery backend timed out after {0:?}")]
    BackendTimeout(Duration),

    /// IO error with the path or operation that caused it
    #[error("IO error ({context}): {source}")]
    Io {
        /// Path or operation being performed
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Artifact move failed; the source is left in place
    #[error("Failed to move {from} to {to}: {source}")]
    Relocate {
        /// Artifact being moved
        from: PathBuf,
        /// Intended destination
        to: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error (Parquet)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an IO error with the path it concerns.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
