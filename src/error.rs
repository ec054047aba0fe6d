//! Error types for the pdf2study library.
//!
//! Failures are contained at the smallest enclosing unit:
//!
//! * [`StudyError`]: **Fatal for its unit**: the run cannot start (bad
//!   configuration, no provider) or one PDF cannot be processed at all
//!   (missing file, corrupt document, pdfium unavailable). The batch driver
//!   logs PDF-level errors and moves on to the next file.
//!
//! * [`PageError`]: **Non-fatal**: a single page failed to render, its OCR
//!   or LLM call failed, or it timed out. Other pages are unaffected; the
//!   page simply does not appear in the persisted output.
//!
//! Pages that ran cleanly but produced nothing usable (no OCR text, no JSON
//! in the model reply) are not errors at all; see [`SkipReason`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run or a single PDF.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The YAML configuration file does not exist.
    #[error("Configuration file not found: '{path}'")]
    ConfigNotFound { path: PathBuf },

    /// The configuration file exists but could not be read or parsed.
    #[error("Failed to load configuration '{path}': {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password; encrypted documents are not supported.
    #[error("PDF '{path}' is encrypted and cannot be opened")]
    PasswordRequired { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Place libpdfium next to the executable, install it system-wide, or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Persistence errors ────────────────────────────────────────────────
    /// Could not create a directory or write one of the JSON documents.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Results already exist and replacing them was not requested.
    #[error("Results folder '{path}' already exists; enable replace_results (--replace) to overwrite it")]
    ResultsExist { path: PathBuf },

    /// A result collection could not be serialised.
    #[error("Failed to serialise '{path}': {detail}")]
    SerializeFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure for a single page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine could not be run or crashed.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The LLM call returned an error.
    #[error("Page {page}: LLM call failed: {detail}")]
    LlmFailed { page: usize, detail: String },

    /// The page task exceeded its time budget and was cancelled.
    #[error("Page {page}: timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    /// The page task panicked.
    #[error("Page {page}: worker panicked: {detail}")]
    Panicked { page: usize, detail: String },
}

impl PageError {
    /// The 1-based page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::LlmFailed { page, .. }
            | PageError::Timeout { page, .. }
            | PageError::Panicked { page, .. } => *page,
        }
    }
}

/// Failure reported by an external collaborator (OCR engine, LLM, image
/// search). The page worker attaches the page number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Why a page ran to completion without producing a result.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// OCR produced no text.
    #[error("no text found on page")]
    EmptyText,

    /// The model reply contained no JSON object.
    #[error("no JSON object in LLM reply")]
    NoJsonObject,

    /// A JSON object was found but did not decode into the expected shape.
    #[error("invalid JSON in LLM reply: {detail}")]
    InvalidJson { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_reports_its_page() {
        let e = PageError::Timeout { page: 4, secs: 30 };
        assert_eq!(e.page(), 4);
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn results_exist_mentions_replace_flag() {
        let e = StudyError::ResultsExist {
            path: PathBuf::from("/tmp/results"),
        };
        let msg = e.to_string();
        assert!(msg.contains("--replace"), "got: {msg}");
        assert!(msg.contains("/tmp/results"));
    }

    #[test]
    fn invalid_json_display_carries_detail() {
        let r = SkipReason::InvalidJson {
            detail: "expected `,` at line 1".into(),
        };
        assert!(r.to_string().contains("line 1"));
    }
}
