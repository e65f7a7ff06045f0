//! Section building: one selected module becomes one fragment sequence.
//!
//! Every section follows the same grammar — item heading, entries in
//! source order, terminal page break — with kind-specific differences
//! that are deliberate: glossaries separate entries with a divider,
//! wikis don't, and database records render field-by-field.

use std::path::Path;

use coursebook_assets::AssetFetcher;
use coursebook_markup::{NormalizePolicy, Normalizer};
use coursebook_source::{ContentItem, ContentKind, ContentSource, DatabaseEntry};
use exn::ResultExt;

use crate::error::{ErrorKind, Result};
use crate::flow;
use crate::fragment::{Fragment, Span, SpanStyle};

const GLOSSARY_MARKER: &str = "Glossary";
const WIKI_MARKER: &str = "Wiki";
const DATABASE_MARKER: &str = "Database";
/// Sub-heading prefix for database records, which have no display name.
const ENTRY_MARKER: &str = "Entry";

/// Builds the fragment sequence for content items, one at a time.
///
/// One builder serves a whole job: it owns the job's [`AssetFetcher`], so
/// the image counter spans all items and handles never collide inside the
/// shared working directory.
pub struct SectionBuilder<'a> {
    source: &'a dyn ContentSource,
    fetcher: AssetFetcher<'a>,
    policy: NormalizePolicy,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(source: &'a dyn ContentSource, work_dir: &Path, policy: NormalizePolicy) -> Self {
        Self { source, fetcher: AssetFetcher::new(source, work_dir), policy }
    }

    /// Build one item's section.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Source`] if entry retrieval fails — whether that
    /// aborts the job is the assembler's call, not this builder's.
    pub fn build(&mut self, item: &ContentItem) -> Result<Vec<Fragment>> {
        tracing::info!(kind = %item.kind, id = item.id, name = item.name.as_str(), "loading module");
        match item.kind {
            ContentKind::Glossary => self.glossary(item),
            ContentKind::Wiki => self.wiki(item),
            ContentKind::Database => self.database(item),
        }
    }

    fn glossary(&mut self, item: &ContentItem) -> Result<Vec<Fragment>> {
        let entries = self.source.glossary_entries(item.id).or_raise(|| ErrorKind::Source)?;
        let mut part = vec![section_heading(&item.name, GLOSSARY_MARKER)];
        let mut first = true;
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Source)?;
            if !first {
                // Divider between entries, never after the last one.
                part.push(Fragment::Divider);
            }
            first = false;
            part.push(Fragment::heading(2, entry.concept));
            part.extend(self.body(&entry.definition)?);
        }
        part.push(Fragment::PageBreak);
        Ok(part)
    }

    fn wiki(&mut self, item: &ContentItem) -> Result<Vec<Fragment>> {
        let pages = self.source.wiki_pages(item.id).or_raise(|| ErrorKind::Source)?;
        let mut part = vec![section_heading(&item.name, WIKI_MARKER)];
        for page in pages {
            let page = page.or_raise(|| ErrorKind::Source)?;
            part.push(Fragment::heading(2, page.title));
            part.extend(self.body(&page.content)?);
        }
        part.push(Fragment::PageBreak);
        Ok(part)
    }

    fn database(&mut self, item: &ContentItem) -> Result<Vec<Fragment>> {
        let entries = self.source.database_entries(item.id).or_raise(|| ErrorKind::Source)?;
        let mut part = vec![section_heading(&item.name, DATABASE_MARKER)];
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Source)?;
            part.push(Fragment::heading(2, format!("{ENTRY_MARKER}: {}", entry.id)));
            part.extend(self.entry_fields(&entry));
        }
        part.push(Fragment::PageBreak);
        Ok(part)
    }

    fn entry_fields(&mut self, entry: &DatabaseEntry) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        for (name, value) in &entry.fields {
            if let Some(url) = entry.files.get(value) {
                // The value names an attached file: embed it instead of
                // printing the file name.
                match self.fetcher.fetch(url) {
                    Ok(path) => fragments.push(Fragment::Image { source: path, width: None, height: None }),
                    Err(err) => tracing::warn!(
                        field = name.as_str(),
                        url = url.as_str(),
                        error = %err,
                        "failed to load attached file, skipping",
                    ),
                }
            } else {
                fragments.push(Fragment::Paragraph {
                    spans: vec![
                        Span::new(format!("{name}: "), SpanStyle::default().bold()),
                        Span::new(value.clone(), SpanStyle::default()),
                    ],
                    bullet: false,
                });
            }
        }
        fragments
    }

    fn body(&mut self, html: &str) -> Result<Vec<Fragment>> {
        let normalized =
            Normalizer::new(&mut self.fetcher, self.policy).normalize(html).or_raise(|| ErrorKind::Markup)?;
        Ok(flow::fragments_from_html(&normalized))
    }
}

fn section_heading(name: &str, marker: &str) -> Fragment {
    Fragment::heading(1, format!("{name} ({marker})"))
}
