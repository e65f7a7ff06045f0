//! Content-source interface for coursebook.
//!
//! The remote learning-management system is an external collaborator: this
//! crate defines the read operations the export pipeline consumes and the
//! typed records they yield, not a transport. A production implementation
//! wraps the web-service client (token handling, RPC dispatch, parameter
//! flattening); tests use [`MockSource`] (feature `mock`).

pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;

#[cfg(feature = "mock")]
pub use crate::mock::MockSource;
pub use crate::models::{ContentItem, ContentKind, DatabaseEntry, GlossaryEntry, WikiPage};

use crate::error::Result;

/// A finite, non-restartable sequence of records.
///
/// The source may page internally; consumers see one ordered stream and
/// must assume each element is produced on demand (a failing page surfaces
/// as an `Err` element mid-sequence).
pub type EntryIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Read operations the export pipeline needs from the remote system.
///
/// All operations block; the pipeline is sequential by design and leaves
/// timeouts and connection management to the implementation. No operation
/// is retried by callers — a failure is surfaced as-is.
pub trait ContentSource {
    /// Root URL of the source. Assets whose host matches this URL are
    /// fetched with the authenticated strategy.
    fn base_url(&self) -> &str;

    /// All entries of a glossary, in source order.
    fn glossary_entries(&self, glossary_id: u64) -> Result<EntryIter<'_, GlossaryEntry>>;

    /// All pages of a wiki, in source order.
    fn wiki_pages(&self, wiki_id: u64) -> Result<EntryIter<'_, WikiPage>>;

    /// All records of a database, in source order.
    fn database_entries(&self, database_id: u64) -> Result<EntryIter<'_, DatabaseEntry>>;

    /// Raw bytes of an asset.
    ///
    /// `source_owned` selects the retrieval strategy: authenticated
    /// request with the service token for the source's own files, plain
    /// request for third-party URLs. Non-success responses are an error;
    /// the bytes are returned without any format interpretation.
    fn fetch_asset(&self, url: &str, source_owned: bool) -> Result<Vec<u8>>;
}
