//! PDF rasterisation: render every page to an image file via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. Each page is rendered inside `tokio::task::spawn_blocking`, and
//! `buffer_unordered` bounds how many run at once.
//!
//! Every render task binds pdfium and opens its own handle to the document,
//! so tasks share no mutable state. A page that fails to render is logged and
//! left out of the image set; the rest of the PDF carries on.

use crate::config::{PipelineConfig, RenderFormat};
use crate::error::{PageError, StudyError};
use crate::output::PageImage;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Renders single PDF pages to image files.
///
/// Implementations are called from blocking threads, possibly many at once.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path) -> Result<usize, StudyError>;

    /// Render page `page_index` (0-based) into `output_dir` and return the
    /// path of the written file. `output_dir` is created if absent.
    fn render(
        &self,
        pdf_path: &Path,
        page_index: usize,
        output_dir: &Path,
        zoom: f32,
        format: RenderFormat,
    ) -> Result<PathBuf, PageError>;
}

/// File name for a rendered page, e.g. `page_3.png`.
pub fn page_file_name(page_number: usize, format: RenderFormat) -> String {
    format!("page_{}.{}", page_number, format.extension())
}

/// [`Rasterizer`] backed by pdfium.
///
/// The library is looked up at `PDFIUM_LIB_PATH` when set, otherwise next to
/// the executable's working directory, then in the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Bind to an explicit pdfium shared library.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, StudyError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| StudyError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

/// Map a pdfium load error onto the PDF-level taxonomy.
fn load_error(pdf_path: &Path, e: PdfiumError) -> StudyError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        StudyError::PasswordRequired {
            path: pdf_path.to_path_buf(),
        }
    } else {
        StudyError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf_path: &Path) -> Result<usize, StudyError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| load_error(pdf_path, e))?;
        Ok(document.pages().len() as usize)
    }

    fn render(
        &self,
        pdf_path: &Path,
        page_index: usize,
        output_dir: &Path,
        zoom: f32,
        format: RenderFormat,
    ) -> Result<PathBuf, PageError> {
        let page_number = page_index + 1;
        let fail = |detail: String| PageError::RenderFailed {
            page: page_number,
            detail,
        };

        let pdfium = self.bind().map_err(|e| fail(e.to_string()))?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| fail(load_error(pdf_path, e).to_string()))?;

        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|e| fail(format!("{:?}", e)))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| fail(format!("{:?}", e)))?;

        // Flatten to RGB: no alpha channel in the output, and JPEG requires it.
        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());

        std::fs::create_dir_all(output_dir).map_err(|e| fail(e.to_string()))?;
        let path = output_dir.join(page_file_name(page_number, format));
        image
            .save_with_format(&path, format.image_format())
            .map_err(|e| fail(e.to_string()))?;

        debug!(
            "Rendered page {} → {}x{} px at {}",
            page_number,
            image.width(),
            image.height(),
            path.display()
        );
        Ok(path)
    }
}

/// Count pages on the blocking pool.
pub async fn count_pages(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
) -> Result<usize, StudyError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.page_count(&path))
        .await
        .map_err(|e| StudyError::Internal(format!("Page-count task panicked: {}", e)))?
}

/// Rasterise all `page_count` pages into `config.image_dir`.
///
/// Returns the successfully written images sorted by page number. Pages that
/// fail are logged and omitted.
pub async fn rasterize_pages(
    rasterizer: Arc<dyn Rasterizer>,
    pdf_path: &Path,
    page_count: usize,
    config: &PipelineConfig,
) -> Vec<PageImage> {
    let zoom = config.zoom;
    let format = config.image_format;

    let mut images: Vec<PageImage> = stream::iter(0..page_count)
        .map(|idx| {
            let rasterizer = Arc::clone(&rasterizer);
            let pdf = pdf_path.to_path_buf();
            let dir = config.image_dir.clone();
            async move {
                let joined = tokio::task::spawn_blocking(move || {
                    rasterizer.render(&pdf, idx, &dir, zoom, format)
                })
                .await;

                match joined {
                    Ok(Ok(path)) => {
                        info!("Extracted page {} to {}", idx + 1, path.display());
                        Some(PageImage {
                            page_number: idx + 1,
                            path,
                        })
                    }
                    Ok(Err(e)) => {
                        warn!("{}", e);
                        None
                    }
                    Err(e) => {
                        warn!("Page {}: render task panicked: {}", idx + 1, e);
                        None
                    }
                }
            }
        })
        .buffer_unordered(config.render_concurrency)
        .filter_map(futures::future::ready)
        .collect()
        .await;

    images.sort_by_key(|img| img.page_number);
    info!("Extracted {} of {} pages as images", images.len(), page_count);
    images
}
