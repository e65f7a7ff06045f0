//! Conversion of normalized HTML into document-flow fragments.
//!
//! The layout engine consumes [`Fragment`]s, not markup, so this module
//! walks a normalized fragment tree and linearizes it: block elements
//! flush paragraphs, headings map to heading fragments, images become
//! standalone fragments at their position in reading order, and lists are
//! flattened to bullet paragraphs (the engine's native list support is
//! not reliable enough to round-trip source markup through). Unknown
//! elements are traversed as plain containers so unrecognized source
//! markup degrades to its text content instead of disappearing.

use std::path::PathBuf;

use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{Html, Node};

use crate::fragment::{Fragment, Span, SpanStyle};

/// Convert one normalized HTML fragment into fragments in reading order.
pub fn fragments_from_html(html: &str) -> Vec<Fragment> {
    let html = Html::parse_fragment(html);
    let mut flow = FlowBuilder::default();
    // The root node is the fragment container, not an element.
    for child in html.tree.root().children() {
        flow.walk(child, SpanStyle::default());
    }
    flow.finish()
}

#[derive(Default)]
struct FlowBuilder {
    fragments: Vec<Fragment>,
    spans: Vec<Span>,
    bullet: bool,
}

impl FlowBuilder {
    fn walk(&mut self, node: NodeRef<'_, Node>, style: SpanStyle) {
        match node.value() {
            Node::Text(text) => self.push_text(&text.text, style),
            Node::Element(element) => match element.name() {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    self.flush();
                    let level = element.name().as_bytes()[1] - b'0';
                    let text = collect_text(node);
                    if !text.is_empty() {
                        self.fragments.push(Fragment::Heading { level, text });
                    }
                }
                "p" | "div" | "blockquote" | "table" | "tr" | "ul" | "ol" => {
                    self.flush();
                    self.walk_children(node, style);
                    self.flush();
                }
                "li" => {
                    self.flush();
                    self.bullet = true;
                    self.walk_children(node, style);
                    self.flush();
                    self.bullet = false;
                }
                "img" => {
                    self.flush();
                    if let Some(fragment) = image_fragment(element) {
                        self.fragments.push(fragment);
                    }
                }
                "b" | "strong" => self.walk_children(node, style.bold()),
                "i" | "em" => self.walk_children(node, style.italic()),
                _ => self.walk_children(node, style),
            },
            _ => {}
        }
    }

    fn walk_children(&mut self, node: NodeRef<'_, Node>, style: SpanStyle) {
        for child in node.children() {
            self.walk(child, style);
        }
    }

    fn push_text(&mut self, raw: &str, style: SpanStyle) {
        if raw.trim().is_empty() {
            return;
        }
        let mut text = collapse_whitespace(raw);
        if self.spans.is_empty() {
            text = text.trim_start().to_string();
        }
        // Merge runs of identical styling into one span.
        if let Some(last) = self.spans.last_mut()
            && last.style == style
        {
            last.text.push_str(&text);
            return;
        }
        self.spans.push(Span { text, style });
    }

    /// Emit the pending spans as a paragraph, if there are any.
    fn flush(&mut self) {
        if let Some(last) = self.spans.last_mut() {
            last.text.truncate(last.text.trim_end().len());
        }
        self.spans.retain(|span| !span.text.is_empty());
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        self.fragments.push(Fragment::Paragraph { spans, bullet: self.bullet });
    }

    fn finish(mut self) -> Vec<Fragment> {
        self.flush();
        self.fragments
    }
}

fn image_fragment(element: &Element) -> Option<Fragment> {
    // Remote references were rewritten during normalization; whatever is
    // left in `src` is a local handle.
    let source = element.attr("src")?;
    Some(Fragment::Image {
        source: PathBuf::from(source),
        width: element.attr("width").and_then(|w| w.parse().ok()),
        height: element.attr("height").and_then(|h| h.parse().ok()),
    })
}

fn collect_text(node: NodeRef<'_, Node>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if let Node::Text(t) = descendant.value() {
            text.push_str(&t.text);
        }
    }
    collapse_whitespace(&text).trim().to_string()
}

fn collapse_whitespace(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                text.push(' ');
            }
            in_whitespace = true;
        } else {
            text.push(c);
            in_whitespace = false;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_paragraphs_split_on_block_elements() {
        let fragments = fragments_from_html("<p>one</p><p>two</p>");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].plain_text(), "one");
        assert_eq!(fragments[1].plain_text(), "two");
    }

    #[rstest]
    #[case("<h1>Title</h1>", 1)]
    #[case("<h2>Title</h2>", 2)]
    #[case("<h3>Title</h3>", 3)]
    fn test_headings_carry_their_level(#[case] html: &str, #[case] expected: u8) {
        let fragments = fragments_from_html(html);
        assert_eq!(fragments, vec![Fragment::heading(expected, "Title")]);
    }

    #[test]
    fn test_inline_styles_become_spans() {
        let fragments = fragments_from_html("<p>plain <b>bold</b> and <i>italic</i></p>");
        let Fragment::Paragraph { spans, .. } = &fragments[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(spans.len(), 4);
        assert!(spans[1].style.bold);
        assert!(spans[3].style.italic);
        assert_eq!(fragments[0].plain_text(), "plain bold and italic");
    }

    #[test]
    fn test_image_interrupts_paragraph_in_reading_order() {
        let fragments = fragments_from_html("<p>before<img src=\"image1\" width=\"50\" height=\"25\">after</p>");
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].plain_text(), "before");
        assert_eq!(
            fragments[1],
            Fragment::Image { source: PathBuf::from("image1"), width: Some(50), height: Some(25) }
        );
        assert_eq!(fragments[2].plain_text(), "after");
    }

    #[test]
    fn test_lists_flatten_to_bullet_paragraphs() {
        let fragments = fragments_from_html("<ul><li>first</li><li>second</li></ul>");
        assert_eq!(fragments.len(), 2);
        for (fragment, expected) in fragments.iter().zip(["first", "second"]) {
            let Fragment::Paragraph { bullet, .. } = fragment else {
                panic!("expected a paragraph");
            };
            assert!(bullet);
            assert_eq!(fragment.plain_text(), expected);
        }
    }

    #[test]
    fn test_unknown_elements_degrade_to_text() {
        let fragments = fragments_from_html("<p><custom-note>kept</custom-note></p>");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].plain_text(), "kept");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let fragments = fragments_from_html("<p>  spread \n  out   text </p>");
        assert_eq!(fragments[0].plain_text(), "spread out text");
    }

    #[test]
    fn test_empty_fragment_produces_nothing() {
        assert!(fragments_from_html("").is_empty());
        assert!(fragments_from_html("   \n ").is_empty());
    }
}
