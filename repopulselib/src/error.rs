//! Error types for repopulselib

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while validating, scheduling or running an analysis
#[derive(Error, Debug)]
pub enum RepopulseError {
    /// Failed to read a source file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    /// Path does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    /// Malformed or contradictory job input
    #[error("invalid request: {0}")]
    Validation(String),

    /// Invalid pool or analysis configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The job queue is full
    #[error("job queue is full (capacity {capacity})")]
    Capacity { capacity: usize },

    /// No job with this id has been submitted
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The pool no longer accepts jobs
    #[error("worker pool is shut down")]
    PoolShutdown,

    /// Clone or checkout failure
    #[error("failed to retrieve repository: {0}")]
    Retrieval(String),

    /// Analysis failed after the repository was retrieved
    #[error("analysis failed: {0}")]
    Computation(String),

    /// A job was asked to move to a state it cannot reach
    #[error("illegal job transition {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// Metrics sink write failure
    #[error("failed to persist metrics: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Git operation error
    #[error("git error: {0}")]
    GitError(String),
}

/// Stable classification of failures, surfaced on failed jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request rejected before a job was created
    Validation,
    /// Queue full at submission time
    Capacity,
    /// Repository could not be cloned, opened or read
    Retrieval,
    /// A file could not be classified or aggregated
    Computation,
    /// Results could not be written to the metrics sink
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Retrieval => "retrieval",
            ErrorKind::Computation => "computation",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RepopulseError {
    /// The stable kind this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepopulseError::Validation(_)
            | RepopulseError::InvalidGlob { .. }
            | RepopulseError::Config(_)
            | RepopulseError::JobNotFound(_)
            | RepopulseError::PoolShutdown => ErrorKind::Validation,
            RepopulseError::Capacity { .. } => ErrorKind::Capacity,
            RepopulseError::PathNotFound(_)
            | RepopulseError::Retrieval(_)
            | RepopulseError::GitError(_) => ErrorKind::Retrieval,
            RepopulseError::FileRead { .. }
            | RepopulseError::Io(_)
            | RepopulseError::Computation(_)
            | RepopulseError::InvalidTransition { .. } => ErrorKind::Computation,
            RepopulseError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            RepopulseError::Capacity { capacity: 3 }.kind(),
            ErrorKind::Capacity
        );
        assert_eq!(
            RepopulseError::GitError("boom".into()).kind(),
            ErrorKind::Retrieval
        );
        assert_eq!(
            RepopulseError::PathNotFound(PathBuf::from("/nope")).kind(),
            ErrorKind::Retrieval
        );
        assert_eq!(
            RepopulseError::Persistence("down".into()).kind(),
            ErrorKind::Persistence
        );
        let read = RepopulseError::FileRead {
            path: PathBuf::from("a.py"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(read.kind(), ErrorKind::Computation);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Persistence).unwrap();
        assert_eq!(json, "\"persistence\"");
    }
}
