//! Result types: page records, the per-PDF aggregate and its projections.
//!
//! Everything persisted to disk derives `Serialize`; the field names are the
//! JSON keys consumers of `output.json` and the projection files rely on.

use crate::error::{PageError, SkipReason};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A rendered page bitmap on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based physical page number in the source PDF.
    pub page_number: usize,
    pub path: PathBuf,
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// Study material for one successfully processed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based position among the rendered images of the PDF.
    pub page_number: usize,
    pub summary: Option<String>,
    pub flashcards: Option<Vec<Flashcard>>,
    pub search_query: Option<String>,
    /// At most [`crate::config::MAX_IMAGE_URLS`] entries.
    pub image_urls: Vec<String>,
    pub image_path: String,
}

/// What happened to one page worker.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Processed(PageResult),
    Skipped { page_number: usize, reason: SkipReason },
    Failed(PageError),
}

impl PageOutcome {
    pub fn page_number(&self) -> usize {
        match self {
            PageOutcome::Processed(r) => r.page_number,
            PageOutcome::Skipped { page_number, .. } => *page_number,
            PageOutcome::Failed(e) => e.page(),
        }
    }

    pub fn into_result(self) -> Option<PageResult> {
        match self {
            PageOutcome::Processed(r) => Some(r),
            _ => None,
        }
    }
}

/// Full nested output for one PDF (`output.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfOutput {
    pub pages: Vec<PageResult>,
}

impl PdfOutput {
    /// Build from completed pages, ordered by page number.
    pub fn from_pages(mut pages: Vec<PageResult>) -> Self {
        pages.sort_by_key(|p| p.page_number);
        Self { pages }
    }

    pub fn projections(&self) -> Projections {
        Projections {
            summaries: self
                .pages
                .iter()
                .map(|p| SummaryEntry {
                    page_number: p.page_number,
                    summary: p.summary.clone(),
                })
                .collect(),
            flashcards: self
                .pages
                .iter()
                .map(|p| FlashcardEntry {
                    page_number: p.page_number,
                    flashcards: p.flashcards.clone(),
                })
                .collect(),
            queries: self
                .pages
                .iter()
                .map(|p| QueryEntry {
                    page_number: p.page_number,
                    search_query: p.search_query.clone(),
                    image_urls: p.image_urls.clone(),
                })
                .collect(),
        }
    }
}

/// Entry of `summaries.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub page_number: usize,
    pub summary: Option<String>,
}

/// Entry of `flashcards.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardEntry {
    pub page_number: usize,
    pub flashcards: Option<Vec<Flashcard>>,
}

/// Entry of `search_queries.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub page_number: usize,
    pub search_query: Option<String>,
    pub image_urls: Vec<String>,
}

/// The three flat views written next to `output.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projections {
    pub summaries: Vec<SummaryEntry>,
    pub flashcards: Vec<FlashcardEntry>,
    pub queries: Vec<QueryEntry>,
}

/// Statistics for one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfReport {
    pub pdf_path: PathBuf,
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages the rasteriser produced an image for.
    pub rendered_pages: usize,
    pub processed_pages: usize,
    pub skipped_pages: usize,
    pub failed_pages: usize,
    /// Whether the result files were written.
    pub persisted: bool,
    pub duration_ms: u64,
}

/// Statistics for a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub reports: Vec<PdfReport>,
    /// PDFs that could not be processed at all, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn processed_pages(&self) -> usize {
        self.reports.iter().map(|r| r.processed_pages).sum()
    }
}
