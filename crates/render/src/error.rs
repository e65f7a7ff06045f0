//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A content-source read failed while building an item's section.
    #[display("content source request failed")]
    Source,
    /// Markup normalization failed for an item's body.
    #[display("markup normalization failed")]
    Markup,
    /// No usable font family was found on this system.
    #[display("font family '{family}' not found in any font directory")]
    FontsNotFound { family: String },
    /// The layout engine rejected the story or the output file.
    #[display("layout engine error: {_0}")]
    Layout(genpdf::error::Error),
    /// A fetched asset exists on disk but could not be decoded as an image.
    #[display("unreadable image asset: {}", _0.display())]
    BadImage(#[error(not(source))] PathBuf),
    /// Underlying I/O error.
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
