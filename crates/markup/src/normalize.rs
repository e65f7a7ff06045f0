//! Fragment normalization over a mutable parse tree.

use coursebook_assets::AssetFetcher;
use exn::OptionExt;
use scraper::{ElementRef, Html, Node};
use tendril::StrTendril;

use crate::error::{ErrorKind, Result};

/// Attributes the downstream renderer does not support or mishandles.
const REMOVE_ATTRIBUTES: [&str; 5] = ["alt", "rel", "target", "class", "style"];
/// Elements the attribute filter applies to.
const FILTERED_ELEMENTS: [&str; 3] = ["img", "a", "span"];

/// Tunable normalization behavior, derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizePolicy {
    /// Factor applied to the width/height attributes of fetched images.
    /// The attributes are the effective display geometry; fetched pixel
    /// data is never resampled.
    pub image_scale: f64,
    /// Drop [`REMOVE_ATTRIBUTES`] from `img`/`a`/`span` elements.
    pub strip_attributes: bool,
}
impl Default for NormalizePolicy {
    fn default() -> Self {
        Self { image_scale: 0.5, strip_attributes: true }
    }
}

/// Rewrites one HTML fragment at a time for the renderer.
///
/// Borrows the job's [`AssetFetcher`] so image handles stay scoped to the
/// job working directory and numbered by the job-wide counter.
pub struct Normalizer<'a, 'src> {
    fetcher: &'a mut AssetFetcher<'src>,
    policy: NormalizePolicy,
}

impl<'a, 'src> Normalizer<'a, 'src> {
    pub fn new(fetcher: &'a mut AssetFetcher<'src>, policy: NormalizePolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Normalize an embedded HTML fragment.
    ///
    /// - every `<img>` with a remote `src` is fetched and re-pointed at a
    ///   local file, its `width`/`height` attributes scaled by the policy
    ///   factor; an image that fails to fetch is dropped with a warning,
    ///   never aborting the fragment,
    /// - `<br>` elements are removed (block markup already carries the
    ///   genuine breaks; keeping both doubles the spacing downstream),
    /// - optionally, noisy inline attributes are stripped.
    ///
    /// Unknown elements pass through untouched. Images whose `src` is not
    /// an http(s) URL are left alone, so running the output through
    /// `normalize` again does not disturb already-rewritten references.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::MalformedMarkup`] if even tolerant parsing could not
    /// recover a fragment tree. Anything the parser *can* recover from is
    /// logged and kept.
    pub fn normalize(&mut self, fragment: &str) -> Result<String> {
        let mut html = Html::parse_fragment(fragment);
        if !html.errors.is_empty() {
            tracing::debug!(errors = html.errors.len(), "recovered from malformed markup");
        }
        self.rewrite_images(&mut html);
        drop_line_breaks(&mut html);
        if self.policy.strip_attributes {
            strip_attributes(&mut html);
        }
        serialize(&html)
    }

    fn rewrite_images(&mut self, html: &mut Html) {
        let images: Vec<_> = html
            .tree
            .nodes()
            .filter_map(|node| match node.value() {
                Node::Element(element) if element.name() == "img" => Some(node.id()),
                _ => None,
            })
            .collect();
        for id in images {
            let (src, width, height) = {
                let Some(node) = html.tree.get(id) else { continue };
                let Node::Element(element) = node.value() else { continue };
                (
                    element.attr("src").map(str::to_string),
                    element.attr("width").and_then(|w| w.parse::<f64>().ok()),
                    element.attr("height").and_then(|h| h.parse::<f64>().ok()),
                )
            };
            let Some(src) = src else { continue };
            if !is_remote(&src) {
                continue;
            }
            match self.fetcher.fetch(&src) {
                Ok(local) => {
                    let factor = self.policy.image_scale;
                    if let Some(mut node) = html.tree.get_mut(id)
                        && let Node::Element(element) = node.value()
                    {
                        for (name, value) in element.attrs.iter_mut() {
                            let name: &str = &name.local;
                            match name {
                                "src" => *value = StrTendril::from(local.to_string_lossy().as_ref()),
                                "width" => {
                                    if let Some(width) = width {
                                        *value = StrTendril::from(scaled(width, factor).as_str());
                                    }
                                }
                                "height" => {
                                    if let Some(height) = height {
                                        *value = StrTendril::from(scaled(height, factor).as_str());
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                }
                Err(err) => {
                    // One broken image must not take the whole fragment
                    // down; drop the reference and keep going.
                    tracing::warn!(url = src.as_str(), error = %err, "failed to load image, dropping reference");
                    if let Some(mut node) = html.tree.get_mut(id) {
                        node.detach();
                    }
                }
            }
        }
    }
}

fn is_remote(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Display-geometry attributes are written back as integers; the source
/// markup may carry fractional values.
fn scaled(value: f64, factor: f64) -> String {
    format!("{}", (value * factor) as u32)
}

fn drop_line_breaks(html: &mut Html) {
    let breaks: Vec<_> = html
        .tree
        .nodes()
        .filter_map(|node| match node.value() {
            Node::Element(element) if element.name() == "br" => Some(node.id()),
            _ => None,
        })
        .collect();
    for id in breaks {
        if let Some(mut node) = html.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn strip_attributes(html: &mut Html) {
    let filtered: Vec<_> = html
        .tree
        .nodes()
        .filter_map(|node| match node.value() {
            Node::Element(element) if FILTERED_ELEMENTS.contains(&element.name()) => Some(node.id()),
            _ => None,
        })
        .collect();
    for id in filtered {
        if let Some(mut node) = html.tree.get_mut(id)
            && let Node::Element(element) = node.value()
        {
            element.attrs.retain(|name, _| {
                let name: &str = &name.local;
                !REMOVE_ATTRIBUTES.contains(&name)
            });
        }
    }
}

fn serialize(html: &Html) -> Result<String> {
    let root = html.tree.root();
    let element = root
        .children()
        .find_map(ElementRef::wrap)
        .ok_or_raise(|| ErrorKind::MalformedMarkup("no recoverable fragment root".to_string()))?;
    Ok(element.inner_html())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use coursebook_source::{ContentSource, MockSource};
    use scraper::{Html, Selector};

    use super::*;

    const BASE: &str = "https://moodle.example.edu/";

    fn normalize_with(source: &dyn ContentSource, dir: &Path, fragment: &str) -> String {
        let mut fetcher = AssetFetcher::new(source, dir);
        Normalizer::new(&mut fetcher, NormalizePolicy::default()).normalize(fragment).unwrap()
    }

    fn img_attr(fragment: &str, attr: &str) -> Option<String> {
        let html = Html::parse_fragment(fragment);
        let selector = Selector::parse("img").unwrap();
        html.select(&selector).next().and_then(|img| img.value().attr(attr).map(str::to_string))
    }

    #[test]
    fn test_rewrites_remote_image_and_scales_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE).with_asset("http://host/a.png", b"png".to_vec());
        let input = "<p>A2<img src=\"http://host/a.png\" width=\"100\" height=\"50\"></p>";
        let output = normalize_with(&source, dir.path(), input);
        let src = img_attr(&output, "src").unwrap();
        assert_eq!(Path::new(&src), dir.path().join("image1"));
        assert_eq!(img_attr(&output, "width").as_deref(), Some("50"));
        assert_eq!(img_attr(&output, "height").as_deref(), Some("25"));
        assert!(output.contains("A2"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE).with_asset("http://host/a.png", b"png".to_vec());
        let input = "<p>Before<br><img src=\"http://host/a.png\" width=\"100\" height=\"50\" alt=\"x\">After</p>";
        let once = normalize_with(&source, dir.path(), input);
        // A second pass with a fresh fetcher must leave the local `src`
        // and the already-scaled geometry untouched.
        let twice = normalize_with(&source, dir.path(), &once);
        assert_eq!(once, twice);
        // Nothing was re-fetched: the rewritten `src` is no longer remote.
        assert_eq!(source.asset_requests().len(), 1);
    }

    #[test]
    fn test_line_breaks_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let output = normalize_with(&source, dir.path(), "<p>one<br>two<br/>three</p>");
        assert_eq!(output, "<p>onetwothree</p>");
    }

    #[test]
    fn test_noisy_attributes_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let input = "<a href=\"x\" target=\"_blank\" class=\"fancy\" rel=\"noopener\">link</a><span style=\"color: red\">text</span>";
        let output = normalize_with(&source, dir.path(), input);
        assert_eq!(output, "<a href=\"x\">link</a><span>text</span>");
    }

    #[test]
    fn test_strip_attributes_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let mut fetcher = AssetFetcher::new(&source, dir.path());
        let policy = NormalizePolicy { strip_attributes: false, ..NormalizePolicy::default() };
        let output = Normalizer::new(&mut fetcher, policy).normalize("<span class=\"keep\">text</span>").unwrap();
        assert_eq!(output, "<span class=\"keep\">text</span>");
    }

    #[test]
    fn test_malformed_markup_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let output = normalize_with(&source, dir.path(), "<p>unclosed <b>bold");
        assert!(output.contains("unclosed"));
        assert!(output.contains("bold"));
    }

    #[test]
    fn test_unknown_elements_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let output = normalize_with(&source, dir.path(), "<custom-note importance=\"high\">hi</custom-note>");
        assert_eq!(output, "<custom-note importance=\"high\">hi</custom-note>");
    }

    #[test]
    fn test_broken_image_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE).with_broken_asset("https://moodle.example.edu/gone.png");
        let input = "<p>intro</p><img src=\"https://moodle.example.edu/gone.png\"><p>outro</p>";
        let output = normalize_with(&source, dir.path(), input);
        assert!(!output.contains("<img"));
        assert!(output.contains("intro"));
        assert!(output.contains("outro"));
    }

    #[test]
    fn test_local_src_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let output = normalize_with(&source, dir.path(), "<img src=\"image3\" width=\"10\">");
        assert_eq!(img_attr(&output, "src").as_deref(), Some("image3"));
        assert_eq!(img_attr(&output, "width").as_deref(), Some("10"));
        assert!(source.asset_requests().is_empty());
    }
}
