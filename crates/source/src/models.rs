//! Typed records returned by a [`ContentSource`](crate::ContentSource).

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// The kind of course module a [`ContentItem`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Glossary,
    Wiki,
    Database,
}
impl ContentKind {
    /// Short lowercase name (for displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Glossary => "glossary",
            ContentKind::Wiki => "wiki",
            ContentKind::Database => "database",
        }
    }
}
impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// One exportable unit selected by the caller.
///
/// Ids are assigned by the source and are only unique *within* a kind,
/// so the pair `(kind, id)` is the real identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub id: u64,
    /// Display name, used for the section heading.
    pub name: String,
}
impl ContentItem {
    pub fn new(kind: ContentKind, id: u64, name: impl Into<String>) -> Self {
        Self { kind, id, name: name.into() }
    }
}

/// One glossary record: a concept and its definition as an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub concept: String,
    /// Definition body, embedded HTML as delivered by the source.
    pub definition: String,
}

/// One wiki page with its server-side cached rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub id: u64,
    pub title: String,
    /// Cached page content, embedded HTML as delivered by the source.
    pub content: String,
}

/// One database record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseEntry {
    pub id: u64,
    /// Field name/value pairs in the order the source defines them.
    /// A value may name a key of [`files`](Self::files), in which case it
    /// refers to an attached file rather than literal text.
    pub fields: Vec<(String, String)>,
    /// Attached files: file name mapped to its download URL.
    pub files: HashMap<String, String>,
}
