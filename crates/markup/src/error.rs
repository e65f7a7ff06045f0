//! Markup Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A markup-normalization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for markup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Parsing is tolerant, so [`ErrorKind::MalformedMarkup`] is reserved for
/// input even best-effort recovery produced nothing from.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The markup is too broken to recover a fragment tree from.
    #[display("malformed markup: {_0}")]
    MalformedMarkup(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The markup is either recoverable or it's not.
        false
    }
}
