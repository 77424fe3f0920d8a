//! Error types for qlog-qsl
//!
//! [`ErrorKind`] is the taxonomy carried by `SyncOutcome::Error` entries in
//! the sync report. [`Error`] covers setup failures outside a run
//! (configuration, opening the database); the run itself never returns one.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failed record or service sub-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Credentials or identity rejected by the service (fatal to that service)
    AuthError,
    /// Transport failure or timeout after bounded retries
    NetworkError,
    /// Malformed service response
    ProtocolError,
    /// Record lacks mandatory fields or carries malformed values
    ParseError,
    /// Contact changed underneath the write and the retry failed too
    Conflict,
    /// Contact vanished before the write
    NotFound,
    /// Local log store backend failure
    StoreError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AuthError => "AuthError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::ProtocolError => "ProtocolError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::StoreError => "StoreError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record lacks mandatory fields or carries malformed values
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Setup error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database open or schema error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// qlog-common error
    #[error("Common error: {0}")]
    Common(#[from] qlog_common::Error),
}

/// Result type for setup operations
pub type Result<T> = std::result::Result<T, Error>;
