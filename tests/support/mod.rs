//! Deterministic collaborators for pipeline tests.

#![allow(dead_code)]

use futures::future::BoxFuture;
use pdf2study::pipeline::llm::LanguageModel;
use pdf2study::pipeline::ocr::TextRecognizer;
use pdf2study::pipeline::render::{page_file_name, Rasterizer};
use pdf2study::pipeline::search::ImageSearch;
use pdf2study::{Collaborators, PageError, PipelineConfig, RenderFormat, ServiceError, StudyError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const PHOTOSYNTHESIS_TEXT: &str =
    "Photosynthesis converts light energy into chemical energy stored in glucose.";

pub const PHOTOSYNTHESIS_REPLY: &str = r#"Sure! Here is the JSON:
{
  "summary": "Plants turn light into chemical energy.",
  "flashcards": [
    {"question": "What does photosynthesis produce?", "answer": "Glucose and oxygen."},
    {"question": "Where does it happen?", "answer": "In the chloroplasts."},
    {"question": "What energy does it use?", "answer": "Light energy."}
  ],
  "search_query": "photosynthesis diagram"
}
Let me know if you need more."#;

/// Writes a small PNG per page; pages listed in `failing` (1-based) fail.
pub struct PngRasterizer {
    pub pages: usize,
    pub failing: Vec<usize>,
}

impl PngRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            failing: Vec::new(),
        }
    }
}

impl Rasterizer for PngRasterizer {
    fn page_count(&self, _pdf_path: &Path) -> Result<usize, StudyError> {
        Ok(self.pages)
    }

    fn render(
        &self,
        _pdf_path: &Path,
        page_index: usize,
        output_dir: &Path,
        _zoom: f32,
        format: RenderFormat,
    ) -> Result<PathBuf, PageError> {
        let page = page_index + 1;
        if self.failing.contains(&page) {
            return Err(PageError::RenderFailed {
                page,
                detail: "stub failure".into(),
            });
        }
        std::fs::create_dir_all(output_dir).unwrap();
        let path = output_dir.join(page_file_name(page, format));
        image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]))
            .save_with_format(&path, format.image_format())
            .unwrap();
        Ok(path)
    }
}

/// Returns text keyed by image file name (`page_2.png`), else `default`.
pub struct MapOcr {
    pub by_file: HashMap<String, String>,
    pub default: String,
    pub delay: HashMap<String, Duration>,
}

impl MapOcr {
    pub fn uniform(text: &str) -> Self {
        Self {
            by_file: HashMap::new(),
            default: text.to_string(),
            delay: HashMap::new(),
        }
    }

    pub fn with_page(mut self, file: &str, text: &str) -> Self {
        self.by_file.insert(file.to_string(), text.to_string());
        self
    }

    pub fn with_delay(mut self, file: &str, delay: Duration) -> Self {
        self.delay.insert(file.to_string(), delay);
        self
    }
}

impl TextRecognizer for MapOcr {
    fn recognize<'a>(
        &'a self,
        image_path: &'a Path,
        _language: &'a str,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move {
            let name = image_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(d) = self.delay.get(&name) {
                tokio::time::sleep(*d).await;
            }
            Ok(self.by_file.get(&name).cloned().unwrap_or_else(|| self.default.clone()))
        })
    }
}

/// Always answers with the same reply and counts calls.
pub struct FixedLlm {
    pub reply: String,
    pub calls: AtomicUsize,
}

impl FixedLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl LanguageModel for FixedLlm {
    fn complete<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, ServiceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(self.reply.clone()) })
    }
}

/// Always returns the same URL list.
pub struct FixedSearch(pub Vec<String>);

impl ImageSearch for FixedSearch {
    fn search<'a>(
        &'a self,
        _query: &'a str,
        _limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, ServiceError>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

pub fn collaborators(
    rasterizer: PngRasterizer,
    ocr: MapOcr,
    llm: Arc<FixedLlm>,
    urls: Vec<&str>,
) -> Collaborators {
    Collaborators {
        rasterizer: Arc::new(rasterizer),
        ocr: Arc::new(ocr),
        llm,
        search: Arc::new(FixedSearch(urls.into_iter().map(String::from).collect())),
    }
}

/// Directory layout under a temp root.
pub struct Layout {
    pub root: tempfile::TempDir,
}

impl Layout {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("pdfs")).unwrap();
        Self { root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Drop a file with a valid PDF header into the input directory.
    pub fn add_pdf(&self, name: &str) -> PathBuf {
        let p = self.path("pdfs").join(name);
        std::fs::write(&p, b"%PDF-1.4\n%stub\n").unwrap();
        p
    }

    pub fn config(&self) -> pdf2study::PipelineConfigBuilder {
        let s = |rel: &str| self.path(rel).to_string_lossy().into_owned();
        PipelineConfig::builder()
            .pdf_dir(s("pdfs"))
            .image_dir(s("images"))
            .results_dir(s("results"))
            .summary_dir(s("results/summaries"))
            .flashcard_dir(s("results/flashcards"))
            .query_dir(s("results/queries"))
            .concurrency(4)
            .render_concurrency(2)
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn json(&self, rel: &str) -> serde_json::Value {
        serde_json::from_str(&self.read(rel)).unwrap()
    }
}
