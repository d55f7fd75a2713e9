//! Error taxonomy for git-backed queries
//!
//! Degraded input (bad numbers, unknown status codes, short lines) never
//! reaches this type: parsers drop it and keep going.

use thiserror::Error;

use crate::core::model::ScopeError;

/// Errors produced while querying a repository through the git binary
#[derive(Error, Debug)]
pub enum GitError {
    /// A parent index, object ID or tree entry does not exist
    #[error("{what} not found")]
    NotFound { what: String },

    /// git exited unsuccessfully; `stderr` holds whatever diagnostic it printed
    #[error("git {args} failed ({status}): {stderr}")]
    ProcessFailure {
        args: String,
        status: String,
        stderr: String,
    },

    /// A required structural element of the output could not be read
    #[error("Unexpected git output: {0}")]
    ParseFailure(String),

    #[error("Invalid object id: {0:?}")]
    InvalidObjectId(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GitError::NotFound { what: what.into() }
    }

    #[allow(dead_code)]
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitError::NotFound { .. })
    }

    /// Stable machine-readable code used in rendered error items
    pub fn code(&self) -> &'static str {
        match self {
            GitError::NotFound { .. } => "NOT_FOUND",
            GitError::ProcessFailure { .. } => "PROCESS_FAILURE",
            GitError::ParseFailure(_) => "PARSE_FAILURE",
            GitError::InvalidObjectId(_) | GitError::InvalidOptions(_) => "INVALID_INPUT",
            GitError::Io(_) => "IO",
        }
    }

    pub fn to_scope_error(&self) -> ScopeError {
        ScopeError::new(self.code(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GitError>;
