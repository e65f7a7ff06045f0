//! Configuration for coursebook exports.
//!
//! Settings are merged from four layers, later layers winning:
//! built-in defaults, a `coursebook.toml` in the per-user configuration
//! directory, a `coursebook.toml` in the working directory (or an explicit
//! file passed to [`Config::load_from`]), and `COURSEBOOK_*` environment
//! variables (nested keys separated by `__`, e.g. `COURSEBOOK_PDF__TITLE`).

pub mod error;

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

const CONFIG_FILE: &str = "coursebook.toml";
const ENV_PREFIX: &str = "COURSEBOOK_";

/// Top-level configuration for one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub source: SourceSettings,
    pub pdf: PdfSettings,
    pub images: ImageSettings,
    pub markup: MarkupSettings,
}

/// Where the remote content lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// Root URL of the content source. Asset URLs under this host are
    /// fetched with the authenticated strategy; everything else is
    /// treated as a third-party asset.
    pub base_url: String,
}

/// Output document settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfSettings {
    /// Document title; also printed in the footer of every page.
    pub title: String,
    /// Document author, for callers that surface output metadata.
    pub author: String,
    /// Default output file name when the caller doesn't supply one.
    pub output_filename: PathBuf,
    /// Horizontal footer border in millimetres.
    pub margin_horizontal: f64,
    /// Vertical footer border in millimetres.
    pub margin_vertical: f64,
    /// Font family name; `{family}-Regular.ttf` and friends must exist
    /// in `font_dir` or one of the standard system font locations.
    pub font_family: String,
    /// Explicit directory to load the font family from.
    pub font_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageSettings {
    /// Factor applied to the width/height attributes of embedded images.
    pub scaling_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupSettings {
    /// Drop inline attributes the renderer mishandles (`alt`, `rel`,
    /// `target`, `class`, `style`) from `img`/`a`/`span` elements.
    pub strip_attributes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            pdf: PdfSettings::default(),
            images: ImageSettings::default(),
            markup: MarkupSettings::default(),
        }
    }
}
impl Default for SourceSettings {
    fn default() -> Self {
        Self { base_url: "https://localhost/".to_string() }
    }
}
impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            title: "Course Export".to_string(),
            author: "coursebook".to_string(),
            output_filename: PathBuf::from("export.pdf"),
            margin_horizontal: 20.0,
            margin_vertical: 15.0,
            font_family: "LiberationSans".to_string(),
            font_dir: None,
        }
    }
}
impl Default for ImageSettings {
    fn default() -> Self {
        Self { scaling_factor: 0.5 }
    }
}
impl Default for MarkupSettings {
    fn default() -> Self {
        Self { strip_attributes: true }
    }
}

impl Config {
    /// Load configuration from the default locations.
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(None))
    }

    /// Load configuration, merging an explicit TOML file on top of the
    /// default locations (but still below the environment).
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(Self::figment(Some(path.as_ref())))
    }

    fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dirs) = directories::ProjectDirs::from("", "", "coursebook") {
            figment = figment.merge(Toml::file(dirs.config_dir().join(CONFIG_FILE)));
        }
        figment = figment.merge(Toml::file(CONFIG_FILE));
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "merging explicit configuration file");
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let url = &self.source.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            exn::bail!(ErrorKind::Invalid(format!("source.base_url must be an http(s) URL, got `{url}`")));
        }
        if self.pdf.title.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("pdf.title must not be empty".to_string()));
        }
        if self.pdf.font_family.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("pdf.font_family must not be empty".to_string()));
        }
        if self.pdf.margin_horizontal < 0.0 || self.pdf.margin_vertical < 0.0 {
            exn::bail!(ErrorKind::Invalid("pdf margins must not be negative".to_string()));
        }
        if !(self.images.scaling_factor > 0.0 && self.images.scaling_factor <= 10.0) {
            exn::bail!(ErrorKind::Invalid(format!(
                "images.scaling_factor must be within (0, 10], got {}",
                self.images.scaling_factor
            )));
        }
        Ok(())
    }
}
