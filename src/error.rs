// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("URI {0} already exists in the registry")]
    Duplicate(String),

    #[error("URI {0} not found in the registry")]
    NotFound(String),

    #[error("Root revision of {uri} is immutable (stored {stored}, got {given})")]
    RootRevisionChanged {
        uri: String,
        stored: String,
        given: String,
    },

    #[error("Registry lock failed for {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("No default branch found for {uri} (tried {tried})")]
    NoDefaultBranch { uri: String, tried: String },

    #[error("History of {revision} has no parent before reaching {boundary}")]
    AmbiguousHistory { boundary: String, revision: String },

    #[error("Backend operation interrupted: {0}")]
    Interrupted(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
}

impl TrackError {
    /// Errors raised by the version-control backend rather than the local store.
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            TrackError::Backend(_)
                | TrackError::Git(_)
                | TrackError::NoDefaultBranch { .. }
                | TrackError::Interrupted(_)
        )
    }
}
