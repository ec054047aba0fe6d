//! Configuration types for study-material generation.
//!
//! Two layers:
//!
//! * [`FileConfig`] mirrors the YAML file on disk (`config.yaml`). The seven
//!   path/language keys are required; everything else is optional.
//! * [`PipelineConfig`] is the validated runtime configuration, built through
//!   [`PipelineConfigBuilder`]. The CLI loads a `FileConfig`, turns it into a
//!   builder, applies flag overrides, then calls `build()`.

use crate::error::StudyError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Hard cap on image URLs stored per page.
pub const MAX_IMAGE_URLS: usize = 8;

/// Runtime configuration for a batch run.
///
/// # Example
/// ```rust
/// use pdf2study::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .pdf_dir("~/lectures")
///     .language("eng")
///     .zoom(4.0)
///     .concurrency(4)
///     .replace_results(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for `*.pdf` files.
    pub pdf_dir: PathBuf,

    /// Tesseract language code, e.g. `eng`, `deu`, `eng+fra`.
    pub language: String,

    /// Where rasterised page images are written.
    pub image_dir: PathBuf,

    /// Receives `output.json`. Deleted and recreated on each write when
    /// `replace_results` is set.
    pub results_dir: PathBuf,

    /// Receives `summaries.json`.
    pub summary_dir: PathBuf,

    /// Receives `flashcards.json`.
    pub flashcard_dir: PathBuf,

    /// Receives `search_queries.json`.
    pub query_dir: PathBuf,

    /// Page magnification used when rasterising. Default: 10.
    ///
    /// 1.0 renders at 72 DPI; 10 gives a 720 DPI bitmap. Memory and CPU grow
    /// with the square of this value.
    pub zoom: f32,

    /// Bitmap format written by the rasteriser. Default: PNG.
    pub image_format: RenderFormat,

    /// Maximum page workers in flight. Default: available parallelism.
    pub concurrency: usize,

    /// Maximum pages rasterised at once. Default: available parallelism.
    pub render_concurrency: usize,

    /// Time budget for one page worker (OCR + LLM + search). Default: 300.
    pub page_timeout_secs: u64,

    /// How tolerant reply extraction is of text around the JSON object.
    pub json_strictness: JsonStrictness,

    /// Permit deleting an existing results directory before writing.
    /// Default: false.
    pub replace_results: bool,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, auto-detected from the environment.
    pub provider_name: Option<String>,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// Sampling temperature for the LLM completion. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page. Default: 2048.
    pub max_tokens: usize,

    /// Timeout for one image-search request. Default: 20.
    pub search_timeout_secs: u64,

    /// Optional progress callback for per-PDF and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("pdfs"),
            language: "eng".to_string(),
            image_dir: PathBuf::from("images"),
            results_dir: PathBuf::from("results"),
            summary_dir: PathBuf::from("results/summaries"),
            flashcard_dir: PathBuf::from("results/flashcards"),
            query_dir: PathBuf::from("results/queries"),
            zoom: 10.0,
            image_format: RenderFormat::default(),
            concurrency: default_parallelism(),
            render_concurrency: default_parallelism(),
            page_timeout_secs: 300,
            json_strictness: JsonStrictness::default(),
            replace_results: false,
            provider_name: None,
            model: None,
            temperature: 0.1,
            max_tokens: 2048,
            search_timeout_secs: 20,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("pdf_dir", &self.pdf_dir)
            .field("language", &self.language)
            .field("image_dir", &self.image_dir)
            .field("results_dir", &self.results_dir)
            .field("summary_dir", &self.summary_dir)
            .field("flashcard_dir", &self.flashcard_dir)
            .field("query_dir", &self.query_dir)
            .field("zoom", &self.zoom)
            .field("image_format", &self.image_format)
            .field("concurrency", &self.concurrency)
            .field("render_concurrency", &self.render_concurrency)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("json_strictness", &self.json_strictness)
            .field("replace_results", &self.replace_results)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("search_timeout_secs", &self.search_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// `~` at the start of the path is expanded to the home directory.
    pub fn pdf_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.pdf_dir = expand_home(dir.as_ref());
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    /// `~` at the start of the path is expanded to the home directory.
    pub fn image_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.image_dir = expand_home(dir.as_ref());
        self
    }

    pub fn results_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.results_dir = expand_home(dir.as_ref());
        self
    }

    pub fn summary_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.summary_dir = expand_home(dir.as_ref());
        self
    }

    pub fn flashcard_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.flashcard_dir = expand_home(dir.as_ref());
        self
    }

    pub fn query_dir(mut self, dir: impl AsRef<str>) -> Self {
        self.config.query_dir = expand_home(dir.as_ref());
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn image_format(mut self, format: RenderFormat) -> Self {
        self.config.image_format = format;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn render_concurrency(mut self, n: usize) -> Self {
        self.config.render_concurrency = n.max(1);
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn json_strictness(mut self, strictness: JsonStrictness) -> Self {
        self.config.json_strictness = strictness;
        self
    }

    pub fn replace_results(mut self, v: bool) -> Self {
        self.config.replace_results = v;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn search_timeout_secs(mut self, secs: u64) -> Self {
        self.config.search_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, StudyError> {
        let c = &self.config;
        if !(c.zoom.is_finite() && c.zoom > 0.0) {
            return Err(StudyError::InvalidConfig(format!(
                "zoom must be a positive number, got {}",
                c.zoom
            )));
        }
        if c.language.trim().is_empty() {
            return Err(StudyError::InvalidConfig("language must not be empty".into()));
        }
        if c.page_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig(
                "page_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.search_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig(
                "search_timeout_secs must be ≥ 1".into(),
            ));
        }
        for (key, dir) in [
            ("pdf_path", &c.pdf_dir),
            ("path_to_directory", &c.image_dir),
            ("results_folder", &c.results_dir),
            ("summary_folder", &c.summary_dir),
            ("flashcard_folder", &c.flashcard_dir),
            ("query_folder", &c.query_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(StudyError::InvalidConfig(format!("{key} must not be empty")));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Bitmap format produced by the rasteriser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Lossless; keeps glyph edges crisp for OCR. (default)
    #[default]
    Png,
    /// Smaller files at high zoom, at some cost in OCR accuracy.
    Jpeg,
}

impl RenderFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Png => "png",
            RenderFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            RenderFormat::Png => image::ImageFormat::Png,
            RenderFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// How reply extraction treats text surrounding the JSON object.
///
/// | Mode | Accepts |
/// |------|---------|
/// | `Lenient` | anything; the span from the first `{` to the last `}` is decoded |
/// | `Strict`  | only a reply that is exactly one JSON object (whitespace allowed) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonStrictness {
    #[default]
    Lenient,
    Strict,
}

// ── YAML file layer ──────────────────────────────────────────────────────

/// The on-disk `config.yaml`.
///
/// ```yaml
/// pdf_path: ~/lectures
/// language: eng
/// path_to_directory: ~/lectures/pages
/// results_folder: results
/// summary_folder: results/summaries
/// flashcard_folder: results/flashcards
/// query_folder: results/queries
/// replace_results: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub pdf_path: String,
    pub language: String,
    pub path_to_directory: String,
    pub results_folder: String,
    pub summary_folder: String,
    pub flashcard_folder: String,
    pub query_folder: String,

    #[serde(default)]
    pub zoom: Option<f32>,
    #[serde(default)]
    pub image_format: Option<RenderFormat>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub render_concurrency: Option<usize>,
    #[serde(default)]
    pub page_timeout_secs: Option<u64>,
    #[serde(default)]
    pub json_strictness: Option<JsonStrictness>,
    #[serde(default)]
    pub replace_results: Option<bool>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub search_timeout_secs: Option<u64>,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl FileConfig {
    /// Parse a YAML document.
    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, StudyError> {
        serde_yaml::from_str(raw).map_err(|e| StudyError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Seed a builder with every value present in the file.
    pub fn into_builder(self) -> PipelineConfigBuilder {
        let mut b = PipelineConfig::builder()
            .pdf_dir(&self.pdf_path)
            .language(self.language)
            .image_dir(&self.path_to_directory)
            .results_dir(&self.results_folder)
            .summary_dir(&self.summary_folder)
            .flashcard_dir(&self.flashcard_folder)
            .query_dir(&self.query_folder);

        if let Some(z) = self.zoom {
            b = b.zoom(z);
        }
        if let Some(f) = self.image_format {
            b = b.image_format(f);
        }
        if let Some(n) = self.concurrency {
            b = b.concurrency(n);
        }
        if let Some(n) = self.render_concurrency {
            b = b.render_concurrency(n);
        }
        if let Some(s) = self.page_timeout_secs {
            b = b.page_timeout_secs(s);
        }
        if let Some(s) = self.json_strictness {
            b = b.json_strictness(s);
        }
        if let Some(r) = self.replace_results {
            b = b.replace_results(r);
        }
        if let Some(p) = self.provider {
            b = b.provider_name(p);
        }
        if let Some(m) = self.model {
            b = b.model(m);
        }
        if let Some(t) = self.temperature {
            b = b.temperature(t);
        }
        if let Some(n) = self.max_tokens {
            b = b.max_tokens(n);
        }
        if let Some(s) = self.search_timeout_secs {
            b = b.search_timeout_secs(s);
        }
        b
    }
}

/// Read and parse a YAML configuration file.
pub async fn load_file_config(path: &Path) -> Result<FileConfig, StudyError> {
    if !path.exists() {
        return Err(StudyError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StudyError::ConfigParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let config = FileConfig::from_yaml(&raw, path)?;
    info!(path = %path.display(), "Configuration file loaded");
    debug!(?config, "Configuration contents");
    Ok(config)
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
pdf_path: ~/pdfs
language: eng
path_to_directory: /tmp/pages
results_folder: out
summary_folder: out/summaries
flashcard_folder: out/flashcards
query_folder: out/queries
zoom: 2.5
json_strictness: strict
replace_results: true
"#;

    #[test]
    fn defaults_are_sane() {
        let c = PipelineConfig::default();
        assert_eq!(c.zoom, 10.0);
        assert_eq!(c.image_format, RenderFormat::Png);
        assert_eq!(c.json_strictness, JsonStrictness::Lenient);
        assert!(!c.replace_results);
        assert!(c.concurrency >= 1);
    }

    #[test]
    fn yaml_round_trips_into_builder() {
        let file = FileConfig::from_yaml(SAMPLE, Path::new("config.yaml")).unwrap();
        assert_eq!(file.zoom, Some(2.5));
        assert_eq!(file.concurrency, None);

        let c = file.into_builder().build().unwrap();
        assert_eq!(c.language, "eng");
        assert_eq!(c.image_dir, PathBuf::from("/tmp/pages"));
        assert_eq!(c.results_dir, PathBuf::from("out"));
        assert_eq!(c.query_dir, PathBuf::from("out/queries"));
        assert_eq!(c.json_strictness, JsonStrictness::Strict);
        assert!(c.replace_results);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(c.pdf_dir, home.join("pdfs"));
        }
    }

    #[test]
    fn yaml_missing_required_key_is_rejected() {
        let raw = "pdf_path: pdfs\nlanguage: eng\n";
        let err = FileConfig::from_yaml(raw, Path::new("c.yaml")).unwrap_err();
        assert!(matches!(err, StudyError::ConfigParse { .. }));
        assert!(err.to_string().contains("path_to_directory"), "got: {err}");
    }

    #[test]
    fn zero_zoom_is_invalid() {
        let err = PipelineConfig::builder().zoom(0.0).build().unwrap_err();
        assert!(matches!(err, StudyError::InvalidConfig(_)));
    }

    #[test]
    fn zero_timeouts_are_invalid() {
        let err = PipelineConfig::builder().page_timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("page_timeout_secs"), "got: {err}");
        let err = PipelineConfig::builder().search_timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("search_timeout_secs"), "got: {err}");
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = PipelineConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn empty_folder_is_invalid() {
        let err = PipelineConfig::builder().summary_dir("").build().unwrap_err();
        assert!(err.to_string().contains("summary_folder"));
    }

    #[test]
    fn expand_home_leaves_plain_paths_alone() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/~x"), PathBuf::from("rel/~x"));
    }

    #[test]
    fn render_format_extensions() {
        assert_eq!(RenderFormat::Png.extension(), "png");
        assert_eq!(RenderFormat::Jpeg.extension(), "jpg");
    }

    #[tokio::test]
    async fn missing_config_file_is_reported() {
        let err = load_file_config(Path::new("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::ConfigNotFound { .. }));
    }
}
