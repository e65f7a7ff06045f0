//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration sources could not be read or deserialized.
    #[display("failed to load configuration: {_0}")]
    Load(figment::Error),
    /// A value was readable but semantically unusable.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
