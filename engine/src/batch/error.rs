use std::path::PathBuf;

use thiserror::Error;

use crate::generator::{ConfigurationError, InvalidSize};

/// Document-level failures. Any of these ends the run before the first job.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Could not read batch file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed batch file: {0}")]
    Malformed(String),
}

/// Why a single job was rejected before execution.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Field '{field}' must be {expected}, got {found}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    InvalidSize(#[from] InvalidSize),

    #[error("Count must be a positive integer, got {0}")]
    InvalidCount(i64),

    #[error("Delay must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecuteError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
