//! Job driver: selected items in, one paginated PDF out.

use std::path::{Path, PathBuf};

use coursebook_config::Config;
use coursebook_markup::NormalizePolicy;
use coursebook_source::{ContentItem, ContentSource};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::fragment::Fragment;
use crate::layout;
use crate::section::SectionBuilder;

/// The top-level export request.
///
/// Created by the caller (selection UI, scripting), consumed exactly once
/// by [`Assembler::assemble`]; nothing about the job survives the run.
pub struct ExportJob<'a> {
    /// Items to export, in the order they should appear in the document.
    pub items: Vec<ContentItem>,
    /// Where the finished PDF goes.
    pub output: PathBuf,
    progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
}

impl<'a> ExportJob<'a> {
    pub fn new(items: Vec<ContentItem>, output: impl Into<PathBuf>) -> Self {
        Self { items, output: output.into(), progress: None }
    }

    /// A job writing to the configured default output file name.
    pub fn with_default_output(items: Vec<ContentItem>, config: &Config) -> Self {
        Self::new(items, config.pdf.output_filename.clone())
    }

    /// Attach a progress observer, called with `(completed, overall)` —
    /// once with `completed = 0` before any work, then once per finished
    /// item. `overall` never changes within a job.
    #[must_use]
    pub fn with_progress(mut self, progress: impl FnMut(usize, usize) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

/// Drives one export job through section building and layout.
pub struct Assembler<'a> {
    source: &'a dyn ContentSource,
    config: &'a Config,
}

impl<'a> Assembler<'a> {
    pub fn new(source: &'a dyn ContentSource, config: &'a Config) -> Self {
        Self { source, config }
    }

    /// Export all items of `job` into one paginated PDF at `job.output`.
    ///
    /// Items are processed sequentially in caller order; each item is
    /// finished (entries and images fetched, fragments built) before the
    /// next begins. A failure in any item aborts the whole job and leaves
    /// no output file — partial documents are never published. The scoped
    /// working directory and every asset in it are removed on all exit
    /// paths.
    #[instrument(skip_all, fields(items = job.items.len(), output = %job.output.display()))]
    pub fn assemble(&self, mut job: ExportJob<'_>) -> Result<()> {
        let work_dir = tempfile::tempdir().map_err(ErrorKind::Io)?;
        let story = self.build_story(&job.items, work_dir.path(), job.progress.as_deref_mut())?;
        tracing::info!(fragments = story.len(), "writing document");
        // Render into the working directory first so a layout failure
        // can't leave a truncated file at the caller's path.
        let staging = work_dir.path().join("output.pdf");
        layout::finalize(story, &self.config.pdf, &staging)?;
        publish(&staging, &job.output)?;
        Ok(())
    }

    /// Build the concatenated fragment story for all items.
    pub(crate) fn build_story(
        &self,
        items: &[ContentItem],
        work_dir: &Path,
        mut progress: Option<&mut (dyn FnMut(usize, usize) + '_)>,
    ) -> Result<Vec<Fragment>> {
        let overall = items.len();
        let mut completed = 0;
        if let Some(callback) = progress.as_mut() {
            callback(completed, overall);
        }
        let policy = NormalizePolicy {
            image_scale: self.config.images.scaling_factor,
            strip_attributes: self.config.markup.strip_attributes,
        };
        let mut builder = SectionBuilder::new(self.source, work_dir, policy);
        let mut story = Vec::new();
        for item in items {
            story.extend(builder.build(item)?);
            completed += 1;
            if let Some(callback) = progress.as_mut() {
                callback(completed, overall);
            }
        }
        Ok(story)
    }
}

/// Move the staged document to its final path. Falls back to a copy when
/// the output lives on a different filesystem than the staging directory.
fn publish(staging: &Path, output: &Path) -> Result<()> {
    if std::fs::rename(staging, output).is_err() {
        std::fs::copy(staging, output).map_err(ErrorKind::Io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use coursebook_source::{ContentKind, MockSource};

    use super::*;

    const BASE: &str = "https://moodle.example.edu/";

    fn config() -> Config {
        Config::default()
    }

    fn mixed_source() -> MockSource {
        MockSource::new(BASE)
            .with_glossary(1, [("Q1", "<p>A1</p>"), ("Q2", "<p>A2</p>")])
            .with_wiki(2, [(1_u64, "Page", "<p>body</p>")])
            .with_glossary(3, [("Q", "<p>A</p>")])
    }

    fn mixed_items() -> Vec<ContentItem> {
        vec![
            ContentItem::new(ContentKind::Glossary, 1, "First"),
            ContentItem::new(ContentKind::Wiki, 2, "Second"),
            ContentItem::new(ContentKind::Glossary, 3, "Third"),
        ]
    }

    #[test]
    fn test_progress_is_monotonic_with_constant_overall() {
        let dir = tempfile::tempdir().unwrap();
        let source = mixed_source();
        let config = config();
        let assembler = Assembler::new(&source, &config);
        let mut calls: Vec<(usize, usize)> = Vec::new();
        assembler
            .build_story(&mixed_items(), dir.path(), Some(&mut |completed, overall| calls.push((completed, overall))))
            .unwrap();
        assert_eq!(calls, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_story_has_one_page_break_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let source = mixed_source();
        let config = config();
        let assembler = Assembler::new(&source, &config);
        let story = assembler.build_story(&mixed_items(), dir.path(), None).unwrap();
        let breaks = story.iter().filter(|f| **f == Fragment::PageBreak).count();
        assert_eq!(breaks, 3);
        // Sections appear in caller order.
        let headings: Vec<String> = story
            .iter()
            .filter_map(|f| match f {
                Fragment::Heading { level: 1, text } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(headings, vec!["First (Glossary)", "Second (Wiki)", "Third (Glossary)"]);
        assert_eq!(story.last(), Some(&Fragment::PageBreak));
    }

    #[test]
    fn test_failing_item_aborts_whole_job_without_output() {
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("export.pdf");
        let source = MockSource::new(BASE).with_glossary(1, [("Q", "<p>A</p>")]);
        let config = config();
        let assembler = Assembler::new(&source, &config);
        let items = vec![
            ContentItem::new(ContentKind::Glossary, 1, "Fine"),
            // Wiki 42 doesn't exist in the mock.
            ContentItem::new(ContentKind::Wiki, 42, "Missing"),
        ];
        let mut calls: Vec<(usize, usize)> = Vec::new();
        let job = ExportJob::new(items, &output).with_progress(|completed, overall| calls.push((completed, overall)));
        let err = assembler.assemble(job).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Source));
        assert!(!output.exists(), "a failed job must not publish a document");
        // Progress already reported stays reported; it just stops early.
        assert_eq!(calls, vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn test_default_output_comes_from_configuration() {
        let config = config();
        let job = ExportJob::with_default_output(Vec::new(), &config);
        assert_eq!(job.output, config.pdf.output_filename);
    }

    #[test]
    fn test_empty_job_reports_zero_of_zero() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockSource::new(BASE);
        let config = config();
        let assembler = Assembler::new(&source, &config);
        let mut calls: Vec<(usize, usize)> = Vec::new();
        let story = assembler
            .build_story(&[], dir.path(), Some(&mut |completed, overall| calls.push((completed, overall))))
            .unwrap();
        assert!(story.is_empty());
        assert_eq!(calls, vec![(0, 0)]);
    }

    /// End-to-end render. Skipped (trivially passing) on machines without
    /// a discoverable font family, like the engine-availability guards in
    /// the render tests this crate is modeled on.
    #[test]
    fn test_assemble_writes_pdf_when_fonts_available() {
        let config = config();
        if crate::layout::font_family(&config.pdf).is_err() {
            eprintln!("skipping: no '{}' font family discoverable", config.pdf.font_family);
            return;
        }
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("export.pdf");
        let source = mixed_source();
        let assembler = Assembler::new(&source, &config);
        assembler.assemble(ExportJob::new(mixed_items(), &output)).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"), "output should be a PDF document");
    }
}
