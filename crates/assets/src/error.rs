//! Asset Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// An asset-fetching error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for asset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The retrieval did not yield a success response for this URL.
    #[display("asset unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The fetched bytes could not be written to the working directory.
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
