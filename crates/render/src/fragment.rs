//! Document fragments: the atomic units handed to the layout engine.

use std::path::PathBuf;

/// Inline text styling for one span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
}
impl SpanStyle {
    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// A run of uniformly styled text within a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}
impl Span {
    pub fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self { text: text.into(), style }
    }
}

/// One atomic unit of document content.
///
/// Fragments are append-only: section builders emit them in reading order
/// and nothing mutates them afterwards; the layout engine consumes the
/// sequence as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Section or entry heading; level 1 is the item heading.
    Heading { level: u8, text: String },
    /// Body text; `bullet` renders with a list marker and indent.
    Paragraph { spans: Vec<Span>, bullet: bool },
    /// A locally fetched image. `width`/`height` carry the display
    /// geometry in pixels when the source markup declared one.
    Image { source: PathBuf, width: Option<u32>, height: Option<u32> },
    /// Thin horizontal rule (between glossary entries).
    Divider,
    /// Hard page boundary terminating an item's section.
    PageBreak,
}

impl Fragment {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::Heading { level, text: text.into() }
    }

    /// A plain single-span paragraph.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Paragraph { spans: vec![Span::new(text, SpanStyle::default())], bullet: false }
    }

    /// Concatenated text content, empty for non-textual fragments.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Heading { text, .. } => text.clone(),
            Self::Paragraph { spans, .. } => spans.iter().map(|span| span.text.as_str()).collect(),
            Self::Image { .. } | Self::Divider | Self::PageBreak => String::new(),
        }
    }
}
