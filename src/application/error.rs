//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::TransportError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("cannot fetch remote ABL: {0}")]
    Transport(#[from] TransportError),

    #[error("{origin} ABL could not be decoded: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode ABL: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("not implemented: {0}")]
    Unsupported(String),

    #[error("ABL index is out of sync: {issues} issue(s) in {path}")]
    IndexDrift { path: PathBuf, issues: usize },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
