//! Layout-engine integration: fonts, page frame, element conversion.
//!
//! Everything genpdf-specific lives here. The rest of the crate deals in
//! [`Fragment`]s; this module turns a finished story into a paginated
//! document with a running footer and writes it out.

use std::path::{Path, PathBuf};

use genpdf::elements::{PageBreak, Paragraph};
use genpdf::error::Error as LayoutError;
use genpdf::fonts::{self, FontData, FontFamily};
use genpdf::style::{Color, LineStyle, Style};
use genpdf::{Context, Document, Element as _, Margins, Position, RenderResult, Scale, Size};
use image::GenericImageView;

use coursebook_config::PdfSettings;

use crate::error::{ErrorKind, Result};
use crate::fragment::{Fragment, SpanStyle};

const BODY_FONT_SIZE: u8 = 11;
const FOOTER_FONT_SIZE: u8 = 10;
/// Vertical space reserved below the content area so text never collides
/// with the footer line, in millimetres.
const FOOTER_CLEARANCE: f64 = 8.0;

/// Directories probed for `{family}-Regular.ttf` when the configuration
/// doesn't name one.
const FONT_DIRS: [&str; 4] = [
    "./fonts",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation-sans-fonts",
    "/usr/share/fonts/TTF",
];

/// Render the story to `output`.
pub(crate) fn finalize(story: Vec<Fragment>, settings: &PdfSettings, output: &Path) -> Result<()> {
    let mut document = Document::new(font_family(settings)?);
    document.set_title(settings.title.clone());
    document.set_page_decorator(PageFrame::new(settings));
    for fragment in story {
        push_fragment(&mut document, fragment)?;
    }
    document.render_to_file(output).map_err(ErrorKind::Layout)?;
    Ok(())
}

/// Locate and load the configured font family.
///
/// Mirrors the engine's file-naming convention: the directory must hold
/// `{family}-Regular.ttf` plus the bold/italic variants.
pub(crate) fn font_family(settings: &PdfSettings) -> Result<FontFamily<FontData>> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &settings.font_dir {
        candidates.push(dir.clone());
    }
    candidates.extend(FONT_DIRS.iter().map(PathBuf::from));
    for dir in &candidates {
        if !dir.join(format!("{}-Regular.ttf", settings.font_family)).is_file() {
            continue;
        }
        tracing::debug!(dir = %dir.display(), family = settings.font_family.as_str(), "loading font family");
        return Ok(fonts::from_files(dir, &settings.font_family, None).map_err(ErrorKind::Layout)?);
    }
    exn::bail!(ErrorKind::FontsNotFound { family: settings.font_family.clone() });
}

fn push_fragment(document: &mut Document, fragment: Fragment) -> Result<()> {
    match fragment {
        Fragment::Heading { level, text } => {
            document.push(Paragraph::new(text).styled(heading_style(level)).padded(Margins::trbl(2.0, 0.0, 1.0, 0.0)));
        }
        Fragment::Paragraph { spans, bullet } => {
            let mut paragraph = Paragraph::default();
            if bullet {
                paragraph.push_styled("\u{2022} ", text_style(SpanStyle::default()));
            }
            for span in spans {
                paragraph.push_styled(span.text, text_style(span.style));
            }
            let indent = if bullet { 4.0 } else { 0.0 };
            document.push(paragraph.padded(Margins::trbl(0.0, 0.0, 0.7, indent)));
        }
        Fragment::Image { source, width, height } => {
            document.push(image_element(&source, width, height)?);
        }
        Fragment::Divider => {
            document.push(Divider::default().padded(Margins::trbl(1.5, 0.0, 1.5, 0.0)));
        }
        Fragment::PageBreak => document.push(PageBreak::new()),
    }
    Ok(())
}

fn heading_style(level: u8) -> Style {
    let size = match level {
        0 | 1 => 16,
        2 => 13,
        _ => 11,
    };
    Style::new().bold().with_font_size(size)
}

fn text_style(style: SpanStyle) -> Style {
    let mut text = Style::new().with_font_size(BODY_FONT_SIZE);
    if style.bold {
        text = text.bold();
    }
    if style.italic {
        text = text.italic();
    }
    text
}

/// Build an image element from a fetched asset.
///
/// Assets are stored without an extension, so the format is sniffed from
/// the bytes. When the markup declared display geometry, the natural
/// pixel size is scaled to match it.
fn image_element(source: &Path, width: Option<u32>, height: Option<u32>) -> Result<genpdf::elements::Image> {
    let bytes = std::fs::read(source).map_err(ErrorKind::Io)?;
    let decoded = image::load_from_memory(&bytes).map_err(|_| ErrorKind::BadImage(source.to_path_buf()))?;
    let (natural_width, natural_height) = decoded.dimensions();
    let mut element = genpdf::elements::Image::from_dynamic_image(decoded).map_err(ErrorKind::Layout)?;
    if let (Some(width), Some(height)) = (width, height)
        && natural_width > 0
        && natural_height > 0
    {
        element = element.with_scale(Scale::new(
            f64::from(width) / f64::from(natural_width),
            f64::from(height) / f64::from(natural_height),
        ));
    }
    Ok(element)
}

/// Draws the running footer — title on the left, `page N` right-aligned —
/// on every page including the first, then carves out the content margins.
struct PageFrame {
    title: String,
    margin_horizontal: f64,
    margin_vertical: f64,
    page: usize,
}

impl PageFrame {
    fn new(settings: &PdfSettings) -> Self {
        Self {
            title: settings.title.clone(),
            margin_horizontal: settings.margin_horizontal,
            margin_vertical: settings.margin_vertical,
            page: 0,
        }
    }
}

impl genpdf::PageDecorator for PageFrame {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: genpdf::render::Area<'a>,
        style: Style,
    ) -> std::result::Result<genpdf::render::Area<'a>, LayoutError> {
        self.page += 1;
        let style = style.with_font_size(FOOTER_FONT_SIZE);
        let width = f64::from(area.size().width);
        let height = f64::from(area.size().height);
        let baseline = height - self.margin_vertical;
        area.print_str(&context.font_cache, Position::new(self.margin_horizontal, baseline), style, self.title.as_str())?;
        let label = format!("page {}", self.page);
        let label_width = f64::from(style.str_width(&context.font_cache, &label));
        area.print_str(
            &context.font_cache,
            Position::new(width - self.margin_horizontal - label_width, baseline),
            style,
            label.as_str(),
        )?;
        area.add_margins(Margins::trbl(
            self.margin_vertical,
            self.margin_horizontal,
            self.margin_vertical + FOOTER_CLEARANCE,
            self.margin_horizontal,
        ));
        Ok(area)
    }
}

/// Thin centered rule between glossary entries; the engine has no native
/// horizontal-rule element.
struct Divider {
    /// Fraction of the available width the rule spans.
    width_fraction: f64,
}

impl Default for Divider {
    fn default() -> Self {
        Self { width_fraction: 0.4 }
    }
}

impl genpdf::Element for Divider {
    fn render(
        &mut self,
        _context: &Context,
        area: genpdf::render::Area<'_>,
        _style: Style,
    ) -> std::result::Result<RenderResult, LayoutError> {
        let total = f64::from(area.size().width);
        let width = total * self.width_fraction;
        let left = (total - width) / 2.0;
        let line = LineStyle::default().with_thickness(0.6).with_color(Color::Rgb(169, 169, 169));
        area.draw_line(vec![Position::new(left, 1.0), Position::new(left + width, 1.0)], line);
        Ok(RenderResult { size: Size::new(total, 2.0), has_more: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_styles_shrink_with_depth() {
        assert_eq!(heading_style(1).font_size(), 16);
        assert_eq!(heading_style(2).font_size(), 13);
        assert_eq!(heading_style(3).font_size(), 11);
        assert_eq!(heading_style(6).font_size(), 11);
    }

    #[test]
    fn test_text_style_carries_span_flags() {
        let bold = text_style(SpanStyle::default().bold());
        assert!(bold.is_bold());
        assert!(!bold.is_italic());
        let italic = text_style(SpanStyle::default().italic());
        assert!(italic.is_italic());
    }

    #[test]
    fn test_missing_fonts_reported_as_such() {
        let settings = PdfSettings {
            font_family: "DefinitelyNotInstalled".to_string(),
            font_dir: None,
            ..PdfSettings::default()
        };
        let err = font_family(&settings).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FontsNotFound { family } if family == "DefinitelyNotInstalled"));
    }

    #[test]
    fn test_unreadable_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image1");
        std::fs::write(&path, b"not an image at all").unwrap();
        let err = image_element(&path, None, None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::BadImage(_)));
    }
}
