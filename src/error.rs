//! Error types for documentation loading, transport, and resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading an API documentation or payload document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API documentation: {message}")]
    InvalidDocument { message: String },

    #[error("reference not found: {reference}")]
    BrokenReference { reference: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors raised by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no transport configured for {path}")]
    Offline { path: String },

    #[cfg(feature = "remote")]
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid response body from {url}: {message}")]
    InvalidBody { url: String, message: String },
}

/// Errors during semantic resolution or operation invocation.
///
/// Resolution misses, ambiguities, and documentation inconsistencies are not
/// errors; they surface as `None` plus a [`Diagnostic`](crate::Diagnostic).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("operation '{operation_id}' documents no {media_type} response for status {status}")]
    UndocumentedResponse {
        operation_id: String,
        status: u16,
        media_type: String,
    },

    #[error("operation '{operation_id}' needs a value for path parameter '{name}'")]
    UnboundParameter { operation_id: String, name: String },

    #[error("unknown operation '{operation_id}'")]
    UnknownOperation { operation_id: String },
}

impl EngineError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Transport(_) => 3,
            _ => 2,
        }
    }
}
