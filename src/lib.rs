//! # pdf2study
//!
//! Turn a directory of PDFs into study material: a summary, flashcards and
//! illustrative image links for every page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF directory
//!  │
//!  ├─ 1. Discover  list *.pdf, check magic bytes
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. OCR       page image → text via tesseract
//!  ├─ 4. LLM       text → JSON {summary, flashcards, search_query}
//!  ├─ 5. Extract   locate and decode the JSON object in the reply
//!  ├─ 6. Search    query → up to 8 image URLs
//!  └─ 7. Write     output.json + summaries / flashcards / search_queries
//! ```
//!
//! Steps 3–6 run concurrently per page, each page in its own task with a
//! timeout. A page that yields no text or no usable reply is left out of the
//! output; it never aborts its PDF.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2study::{run_batch, Collaborators, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = PipelineConfig::builder()
//!         .pdf_dir("~/lectures")
//!         .image_dir("~/lectures/pages")
//!         .replace_results(true)
//!         .build()?;
//!     let services = Collaborators::from_config(&config)?;
//!     let report = run_batch(&config, &services).await;
//!     eprintln!("{} pages of study material", report.processed_pages());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2study` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    load_file_config, FileConfig, JsonStrictness, PipelineConfig, PipelineConfigBuilder,
    RenderFormat, MAX_IMAGE_URLS,
};
pub use error::{PageError, ServiceError, SkipReason, StudyError};
pub use output::{
    BatchReport, Flashcard, PageOutcome, PageResult, PdfOutput, PdfReport, Projections,
};
pub use process::{process_pdf, run_batch, Collaborators};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
