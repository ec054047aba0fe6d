//! Pipeline stages for turning a PDF into study material.
//!
//! Each submodule implements one step. The external services (pdfium,
//! tesseract, the LLM, image search) sit behind traits so every stage can be
//! exercised with deterministic stubs.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ render ──▶ worker: ocr ──▶ llm ──▶ extract ──▶ search
//! (*.pdf)      (pdfium)           (tesseract) (LLM) (JSON)     (image URLs)
//! ```
//!
//! 1. [`discover`]: list the PDFs of the input directory and check their magic bytes
//! 2. [`render`]:   rasterise every page on the blocking pool; each task opens
//!    its own document handle
//! 3. [`ocr`]:      image → text via the `tesseract` CLI
//! 4. [`llm`]:      prompt → reply through an `edgequake-llm` provider
//! 5. [`extract`]:  locate and decode the JSON object in the reply
//! 6. [`search`]:   query → up to 8 illustrative image URLs
//! 7. [`worker`]:   run steps 3–6 for one page and classify the outcome

pub mod discover;
pub mod extract;
pub mod llm;
pub mod ocr;
pub mod render;
pub mod search;
pub mod worker;
