//! In-memory content source for testing.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::error::{ErrorKind, Result};
use crate::{ContentSource, DatabaseEntry, EntryIter, GlossaryEntry, WikiPage};

/// In-memory content source for testing.
///
/// Records are preloaded through the builder methods, so unit tests can
/// drive the whole pipeline without a network or a live service. Asset
/// requests are logged with the strategy flag the caller chose, which is
/// how the fetcher's routing decisions get asserted.
///
/// # Examples
///
/// ```
/// use coursebook_source::{ContentSource, MockSource};
///
/// let source = MockSource::new("https://moodle.example.edu/")
///     .with_glossary(7, [("Term", "<p>Definition</p>")])
///     .with_asset("https://moodle.example.edu/pluginfile.php/1/a.png", b"png".to_vec());
/// let entries: Vec<_> = source.glossary_entries(7).unwrap().collect();
/// assert_eq!(entries.len(), 1);
/// ```
pub struct MockSource {
    base_url: String,
    glossaries: HashMap<u64, Vec<GlossaryEntry>>,
    wikis: HashMap<u64, Vec<WikiPage>>,
    databases: HashMap<u64, Vec<DatabaseEntry>>,
    assets: HashMap<String, Vec<u8>>,
    broken_assets: HashSet<String>,
    asset_requests: RefCell<Vec<(String, bool)>>,
}

impl MockSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            glossaries: HashMap::new(),
            wikis: HashMap::new(),
            databases: HashMap::new(),
            assets: HashMap::new(),
            broken_assets: HashSet::new(),
            asset_requests: RefCell::new(Vec::new()),
        }
    }

    /// Preload a glossary as `(concept, definition-HTML)` pairs.
    pub fn with_glossary(
        mut self,
        id: u64,
        entries: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(concept, definition)| GlossaryEntry {
                concept: concept.into(),
                definition: definition.into(),
            })
            .collect();
        self.glossaries.insert(id, entries);
        self
    }

    /// Preload a wiki as `(page id, title, cached-content-HTML)` triples.
    pub fn with_wiki(
        mut self,
        id: u64,
        pages: impl IntoIterator<Item = (u64, impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let pages = pages
            .into_iter()
            .map(|(page_id, title, content)| WikiPage {
                id: page_id,
                title: title.into(),
                content: content.into(),
            })
            .collect();
        self.wikis.insert(id, pages);
        self
    }

    /// Preload a database with fully-formed records.
    pub fn with_database(mut self, id: u64, entries: impl IntoIterator<Item = DatabaseEntry>) -> Self {
        self.databases.insert(id, entries.into_iter().collect());
        self
    }

    /// Serve `bytes` for `url`.
    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.assets.insert(url.into(), bytes);
        self
    }

    /// Make requests for `url` fail with a server error.
    pub fn with_broken_asset(mut self, url: impl Into<String>) -> Self {
        self.broken_assets.insert(url.into());
        self
    }

    /// Every asset request seen so far, as `(url, source_owned)` pairs in
    /// call order.
    pub fn asset_requests(&self) -> Vec<(String, bool)> {
        self.asset_requests.borrow().clone()
    }
}
impl Default for MockSource {
    fn default() -> Self {
        Self::new("https://mock.invalid/")
    }
}

fn missing(table: &str, id: u64) -> ErrorKind {
    ErrorKind::Remote {
        code: "invalidrecord".to_string(),
        message: format!("Can't find data record in table {table} with id {id}"),
    }
}

impl ContentSource for MockSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn glossary_entries(&self, glossary_id: u64) -> Result<EntryIter<'_, GlossaryEntry>> {
        match self.glossaries.get(&glossary_id) {
            Some(entries) => Ok(Box::new(entries.clone().into_iter().map(Ok))),
            None => exn::bail!(missing("glossary", glossary_id)),
        }
    }

    fn wiki_pages(&self, wiki_id: u64) -> Result<EntryIter<'_, WikiPage>> {
        match self.wikis.get(&wiki_id) {
            Some(pages) => Ok(Box::new(pages.clone().into_iter().map(Ok))),
            None => exn::bail!(missing("wiki", wiki_id)),
        }
    }

    fn database_entries(&self, database_id: u64) -> Result<EntryIter<'_, DatabaseEntry>> {
        match self.databases.get(&database_id) {
            Some(entries) => Ok(Box::new(entries.clone().into_iter().map(Ok))),
            None => exn::bail!(missing("data", database_id)),
        }
    }

    fn fetch_asset(&self, url: &str, source_owned: bool) -> Result<Vec<u8>> {
        self.asset_requests.borrow_mut().push((url.to_string(), source_owned));
        if self.broken_assets.contains(url) {
            exn::bail!(ErrorKind::Status { code: 500, url: url.to_string() });
        }
        match self.assets.get(url) {
            Some(bytes) => Ok(bytes.clone()),
            None => exn::bail!(ErrorKind::Status { code: 404, url: url.to_string() }),
        }
    }
}
