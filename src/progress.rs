//! Progress-callback trait for batch and page events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to observe the
//! pipeline as it works through PDFs and pages.
//!
//! # Example
//!
//! ```rust
//! use pdf2study::{PipelineProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_number: usize, total_pages: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_number}/{total_pages} done");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let config = PipelineConfig::builder()
//!     .progress_callback(cb as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes PDFs and pages.
///
/// Page events arrive concurrently from different tasks, in completion order.
/// All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// A PDF has been rasterised and `total_pages` page workers are about to run.
    fn on_pdf_start(&self, pdf_path: &Path, total_pages: usize) {
        let _ = (pdf_path, total_pages);
    }

    /// A page produced a result.
    fn on_page_complete(&self, page_number: usize, total_pages: usize) {
        let _ = (page_number, total_pages);
    }

    /// A page was skipped (no text, unusable reply) or failed.
    fn on_page_dropped(&self, page_number: usize, total_pages: usize, reason: String) {
        let _ = (page_number, total_pages, reason);
    }

    /// The PDF is done. Also sent, with zero counts, when no page rendered and
    /// `on_pdf_start` was never called.
    fn on_pdf_complete(&self, pdf_path: &Path, total_pages: usize, success_count: usize) {
        let _ = (pdf_path, total_pages, success_count);
    }
}

/// Type alias for a shared progress callback.
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

/// A callback that does nothing.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}
