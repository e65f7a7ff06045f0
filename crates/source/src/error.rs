//! Source Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A content-source error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for content-source operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// The remote service reports failures as a tagged payload with a machine
/// code and a human message; both are carried verbatim so callers can
/// surface them without re-parsing.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote call returned an exception payload.
    #[display("remote call failed ({code}): {message}")]
    Remote { code: String, message: String },
    /// An asset request returned a non-success status.
    #[display("asset request returned status {code}: {url}")]
    Status { code: u16, url: String },
    /// The request never produced a response (connection, DNS, TLS, ...).
    #[display("transport failure: {_0}")]
    Transport(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { .. } => false,
            Self::Status { code, .. } => *code >= 500,
            Self::Transport(_) => true,
        }
    }
}
