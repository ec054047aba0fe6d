//! PDF pipeline and batch driver.
//!
//! [`process_pdf`] runs the two fan-out/fan-in stages for one document:
//! rasterise every page, then run a page worker for every rendered image,
//! then aggregate and persist. [`run_batch`] does that for each PDF in the
//! input directory, one at a time.
//!
//! Failures stay inside the smallest unit they belong to: a page failure
//! never aborts its PDF, a PDF failure never aborts the batch.

use crate::config::PipelineConfig;
use crate::error::{PageError, StudyError};
use crate::output::{BatchReport, PageImage, PageOutcome, PdfOutput, PdfReport};
use crate::pipeline::llm::{LanguageModel, ProviderModel};
use crate::pipeline::ocr::{TesseractOcr, TextRecognizer};
use crate::pipeline::render::{self, PdfiumRasterizer, Rasterizer};
use crate::pipeline::search::{GoogleImageSearch, ImageSearch};
use crate::pipeline::{discover, worker};
use crate::writer;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn, Instrument};

/// The external services the pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub llm: Arc<dyn LanguageModel>,
    pub search: Arc<dyn ImageSearch>,
}

impl Collaborators {
    /// Production services: pdfium, tesseract, an `edgequake-llm` provider
    /// and Google Images.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, StudyError> {
        let search = GoogleImageSearch::new(Duration::from_secs(config.search_timeout_secs))
            .map_err(|e| StudyError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            rasterizer: Arc::new(PdfiumRasterizer::new()),
            ocr: Arc::new(TesseractOcr::new()),
            llm: Arc::new(ProviderModel::from_config(config)?),
            search: Arc::new(search),
        })
    }
}

/// Process every PDF in `config.pdf_dir`.
///
/// An empty or missing input directory is logged and yields an empty report;
/// no output directories are touched in that case.
#[instrument(name = "batch", skip_all, fields(pdf_dir = %config.pdf_dir.display()))]
pub async fn run_batch(config: &PipelineConfig, services: &Collaborators) -> BatchReport {
    info!("Processing PDFs in directory: {}", config.pdf_dir.display());

    let pdfs = discover::find_pdfs(&config.pdf_dir);
    if pdfs.is_empty() {
        error!("No PDF files found in {}", config.pdf_dir.display());
        return BatchReport::default();
    }

    // Results from an earlier run are protected by `replace_results`; results
    // written by this batch are always replaced by the next PDF.
    let mut config = config.clone();
    let mut batch = BatchReport::default();
    for pdf in pdfs {
        match process_pdf(&pdf, &config, services).await {
            Ok(report) => {
                if report.persisted {
                    config.replace_results = true;
                }
                batch.reports.push(report)
            }
            Err(e) => {
                error!("Failed to process {}: {}", pdf.display(), e);
                batch.failed.push((pdf, e.to_string()));
            }
        }
    }

    info!(
        "All PDFs processed: {} ok, {} failed, {} pages of study material",
        batch.reports.len(),
        batch.failed.len(),
        batch.processed_pages()
    );
    batch
}

/// Run the full pipeline for one PDF and persist its results.
///
/// # Errors
/// Only PDF-level failures: the file is missing or not a PDF, pdfium cannot
/// open it, or the image directory cannot be created. A failure to persist
/// results is logged and reported as `persisted = false`.
#[instrument(name = "pdf", skip_all, fields(pdf = %pdf_path.display()))]
pub async fn process_pdf(
    pdf_path: &Path,
    config: &PipelineConfig,
    services: &Collaborators,
) -> Result<PdfReport, StudyError> {
    let start = Instant::now();
    info!("Processing PDF file: {}", pdf_path.display());

    discover::validate_pdf(pdf_path)?;

    // ── Step 1: image directory ──────────────────────────────────────────
    tokio::fs::create_dir_all(&config.image_dir)
        .await
        .map_err(|e| StudyError::OutputWriteFailed {
            path: config.image_dir.clone(),
            source: e,
        })?;

    // ── Step 2: rasterise all pages ──────────────────────────────────────
    let total_pages = render::count_pages(Arc::clone(&services.rasterizer), pdf_path).await?;
    info!(
        "Extracting {} pages as images at zoom {} (high zoom takes a while)",
        total_pages, config.zoom
    );
    let images =
        render::rasterize_pages(Arc::clone(&services.rasterizer), pdf_path, total_pages, config)
            .await;

    let mut report = PdfReport {
        pdf_path: pdf_path.to_path_buf(),
        total_pages,
        rendered_pages: images.len(),
        ..Default::default()
    };

    // ── Step 3: nothing rendered, nothing written ────────────────────────
    if images.is_empty() {
        warn!("No images were saved from {}", pdf_path.display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_pdf_complete(pdf_path, 0, 0);
        }
        report.duration_ms = start.elapsed().as_millis() as u64;
        return Ok(report);
    }

    // ── Step 4: page workers ─────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_pdf_start(pdf_path, images.len());
    }
    let outcomes = process_images(&images, config, services).await;

    // ── Step 5: aggregate ────────────────────────────────────────────────
    let mut pages = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            PageOutcome::Processed(result) => pages.push(result),
            PageOutcome::Skipped { .. } => report.skipped_pages += 1,
            PageOutcome::Failed(_) => report.failed_pages += 1,
        }
    }
    report.processed_pages = pages.len();

    let output = PdfOutput::from_pages(pages);
    let projections = output.projections();

    // ── Step 6: persist ──────────────────────────────────────────────────
    match writer::save_results(&output, &projections, config).await {
        Ok(()) => report.persisted = true,
        Err(e) => error!("An error occurred while saving results: {}", e),
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_pdf_complete(pdf_path, images.len(), report.processed_pages);
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Finished {}: {}/{} pages processed ({} skipped, {} failed) in {}ms",
        pdf_path.display(),
        report.processed_pages,
        report.rendered_pages,
        report.skipped_pages,
        report.failed_pages,
        report.duration_ms
    );
    Ok(report)
}

/// Fan the page worker out over all rendered images and wait for every task.
///
/// Outcomes arrive in completion order.
async fn process_images(
    images: &[PageImage],
    config: &PipelineConfig,
    services: &Collaborators,
) -> Vec<PageOutcome> {
    let total = images.len();
    stream::iter(images.iter().enumerate().map(|(i, image)| {
        let page_number = i + 1;
        let services = services.clone();
        let config = config.clone();
        let image_path = image.path.clone();
        async move {
            let callback = config.progress_callback.clone();
            let outcome = run_page_task(services, config, image_path, page_number).await;
            if let Some(cb) = callback {
                match &outcome {
                    PageOutcome::Processed(_) => cb.on_page_complete(page_number, total),
                    PageOutcome::Skipped { reason, .. } => {
                        cb.on_page_dropped(page_number, total, reason.to_string())
                    }
                    PageOutcome::Failed(e) => cb.on_page_dropped(page_number, total, e.to_string()),
                }
            }
            outcome
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

/// Run one page worker as its own task under the page timeout.
///
/// The task runs inside the caller's `pdf` span so worker logs carry the file.
/// Expiry drops the worker future, which cancels any in-flight request and
/// kills a running OCR process. A panic inside the worker surfaces here as a
/// join error.
async fn run_page_task(
    services: Collaborators,
    config: PipelineConfig,
    image_path: PathBuf,
    page_number: usize,
) -> PageOutcome {
    let secs = config.page_timeout_secs;
    let handle = tokio::spawn(
        async move {
            tokio::time::timeout(
                Duration::from_secs(secs),
                worker::process_page(&services, &image_path, page_number, &config),
            )
            .await
        }
        .in_current_span(),
    );

    match handle.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_elapsed)) => {
            let err = PageError::Timeout {
                page: page_number,
                secs,
            };
            error!("{}", err);
            PageOutcome::Failed(err)
        }
        Err(e) => {
            let err = PageError::Panicked {
                page: page_number,
                detail: e.to_string(),
            };
            error!("{}", err);
            PageOutcome::Failed(err)
        }
    }
}
