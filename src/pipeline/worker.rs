//! Page worker: one rendered page in, one classified outcome out.
//!
//! Steps: OCR → prompt → LLM → JSON extraction → image search. Each of the
//! first four is a hard stop; image search degrades to an empty URL list.
//! This function never returns an error: everything that can go wrong is
//! folded into [`PageOutcome`]. Timeouts and panics are handled one level up,
//! where the worker runs as its own task.

use crate::config::{PipelineConfig, MAX_IMAGE_URLS};
use crate::error::{PageError, SkipReason};
use crate::output::{PageOutcome, PageResult};
use crate::pipeline::extract::parse_reply;
use crate::process::Collaborators;
use crate::prompts::study_prompt;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Run the full page pipeline for `image_path`.
///
/// `page_number` is the 1-based position of the image among the PDF's
/// rendered pages.
#[instrument(name = "page", skip_all, fields(page = page_number))]
pub async fn process_page(
    services: &Collaborators,
    image_path: &Path,
    page_number: usize,
    config: &PipelineConfig,
) -> PageOutcome {
    info!("Processing image: {}", image_path.display());

    // ── Step 1: OCR ──────────────────────────────────────────────────────
    let text = match services.ocr.recognize(image_path, &config.language).await {
        Ok(text) => text,
        Err(e) => {
            let err = PageError::OcrFailed {
                page: page_number,
                detail: e.to_string(),
            };
            error!("{}", err);
            return PageOutcome::Failed(err);
        }
    };

    if text.trim().is_empty() {
        warn!("No text found on page {}, skipping", page_number);
        return PageOutcome::Skipped {
            page_number,
            reason: SkipReason::EmptyText,
        };
    }
    debug!("Extracted {} chars of text", text.len());

    // ── Step 2–3: prompt and LLM call ────────────────────────────────────
    let prompt = study_prompt(&text);
    let reply = match services.llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            let err = PageError::LlmFailed {
                page: page_number,
                detail: e.to_string(),
            };
            error!("{}", err);
            return PageOutcome::Failed(err);
        }
    };

    // ── Step 4–6: extract and decode the JSON object ─────────────────────
    let parsed = match parse_reply(&reply, config.json_strictness) {
        Ok(parsed) => parsed,
        Err(reason) => {
            error!("Page {}: {}", page_number, reason);
            return PageOutcome::Skipped {
                page_number,
                reason,
            };
        }
    };
    debug!("Parsed LLM reply");

    // ── Step 7: image search (best effort) ───────────────────────────────
    let image_urls = match parsed.search_query.as_deref().map(str::trim) {
        Some(query) if !query.is_empty() => {
            match services.search.search(query, MAX_IMAGE_URLS).await {
                Ok(mut urls) => {
                    urls.truncate(MAX_IMAGE_URLS);
                    urls
                }
                Err(e) => {
                    warn!("Image search failed for page {}: {}", page_number, e);
                    Vec::new()
                }
            }
        }
        _ => {
            debug!("No search query; skipping image search");
            Vec::new()
        }
    };

    // ── Step 8: assemble ─────────────────────────────────────────────────
    PageOutcome::Processed(PageResult {
        page_number,
        summary: parsed.summary,
        flashcards: parsed.flashcards,
        search_query: parsed.search_query,
        image_urls,
        image_path: image_path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JsonStrictness, RenderFormat};
    use crate::error::{ServiceError, StudyError};
    use crate::pipeline::llm::LanguageModel;
    use crate::pipeline::ocr::TextRecognizer;
    use crate::pipeline::render::Rasterizer;
    use crate::pipeline::search::ImageSearch;
    use futures::future::BoxFuture;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const GOOD_REPLY: &str = r#"Here it is: {"summary":"S","flashcards":[{"question":"Q","answer":"A"}],"search_query":"cells"} done"#;

    struct NoRaster;
    impl Rasterizer for NoRaster {
        fn page_count(&self, _: &Path) -> Result<usize, StudyError> {
            Ok(0)
        }
        fn render(
            &self,
            _: &Path,
            i: usize,
            _: &Path,
            _: f32,
            _: RenderFormat,
        ) -> Result<PathBuf, PageError> {
            Err(PageError::RenderFailed {
                page: i + 1,
                detail: "unused".into(),
            })
        }
    }

    struct FixedOcr(Result<String, ServiceError>);
    impl TextRecognizer for FixedOcr {
        fn recognize<'a>(
            &'a self,
            _: &'a Path,
            _: &'a str,
        ) -> BoxFuture<'a, Result<String, ServiceError>> {
            Box::pin(async move { self.0.clone() })
        }
    }

    struct FixedLlm(Result<String, ServiceError>);
    impl LanguageModel for FixedLlm {
        fn complete<'a>(&'a self, _: &'a str) -> BoxFuture<'a, Result<String, ServiceError>> {
            Box::pin(async move { self.0.clone() })
        }
    }

    struct CountingSearch {
        calls: AtomicUsize,
        result: Result<Vec<String>, ServiceError>,
    }
    impl ImageSearch for CountingSearch {
        fn search<'a>(
            &'a self,
            _: &'a str,
            _: usize,
        ) -> BoxFuture<'a, Result<Vec<String>, ServiceError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { self.result.clone() })
        }
    }

    fn services(
        ocr: Result<&str, &str>,
        llm: Result<&str, &str>,
        search: Result<Vec<String>, &str>,
    ) -> (Collaborators, Arc<CountingSearch>) {
        let search = Arc::new(CountingSearch {
            calls: AtomicUsize::new(0),
            result: search.map_err(ServiceError::new),
        });
        let c = Collaborators {
            rasterizer: Arc::new(NoRaster),
            ocr: Arc::new(FixedOcr(ocr.map(String::from).map_err(ServiceError::new))),
            llm: Arc::new(FixedLlm(llm.map(String::from).map_err(ServiceError::new))),
            search: search.clone(),
        };
        (c, search)
    }

    async fn run(c: &Collaborators) -> PageOutcome {
        process_page(c, Path::new("/imgs/page_1.png"), 1, &PipelineConfig::default()).await
    }

    #[tokio::test]
    async fn happy_path_builds_result() {
        let (c, search) = services(
            Ok("Cells divide."),
            Ok(GOOD_REPLY),
            Ok(vec!["http://a/1.png".into()]),
        );
        let result = run(&c).await.into_result().expect("processed");
        assert_eq!(result.page_number, 1);
        assert_eq!(result.summary.as_deref(), Some("S"));
        assert_eq!(result.search_query.as_deref(), Some("cells"));
        assert_eq!(result.image_urls, vec!["http://a/1.png"]);
        assert_eq!(result.image_path, "/imgs/page_1.png");
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_ocr_text_is_skipped_before_llm() {
        let (c, search) = services(Ok("  \n\t "), Ok(GOOD_REPLY), Ok(vec![]));
        assert_eq!(
            run(&c).await,
            PageOutcome::Skipped {
                page_number: 1,
                reason: SkipReason::EmptyText,
            }
        );
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ocr_crash_is_a_failure_not_a_skip() {
        let (c, _) = services(Err("tesseract missing"), Ok(GOOD_REPLY), Ok(vec![]));
        match run(&c).await {
            PageOutcome::Failed(PageError::OcrFailed { page, detail }) => {
                assert_eq!(page, 1);
                assert!(detail.contains("tesseract missing"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn llm_error_fails_the_page() {
        let (c, _) = services(Ok("text"), Err("401 unauthorized"), Ok(vec![]));
        assert!(matches!(run(&c).await, PageOutcome::Failed(PageError::LlmFailed { .. })));
    }

    #[tokio::test]
    async fn reply_without_json_is_skipped() {
        let (c, _) = services(Ok("text"), Ok("Sorry, I can't do that."), Ok(vec![]));
        assert_eq!(
            run(&c).await,
            PageOutcome::Skipped {
                page_number: 1,
                reason: SkipReason::NoJsonObject,
            }
        );
    }

    #[tokio::test]
    async fn strict_mode_skips_wrapped_reply() {
        let (c, _) = services(Ok("text"), Ok(GOOD_REPLY), Ok(vec![]));
        let config = PipelineConfig::builder()
            .json_strictness(JsonStrictness::Strict)
            .build()
            .unwrap();
        let outcome = process_page(&c, Path::new("p.png"), 3, &config).await;
        assert_eq!(
            outcome,
            PageOutcome::Skipped {
                page_number: 3,
                reason: SkipReason::NoJsonObject,
            }
        );
    }

    #[tokio::test]
    async fn search_failure_degrades_to_no_urls() {
        let (c, _) = services(Ok("text"), Ok(GOOD_REPLY), Err("429"));
        let result = run(&c).await.into_result().expect("page still succeeds");
        assert!(result.image_urls.is_empty());
    }

    #[tokio::test]
    async fn oversized_search_result_is_capped() {
        let many: Vec<String> = (0..20).map(|i| format!("http://img/{i}")).collect();
        let (c, _) = services(Ok("text"), Ok(GOOD_REPLY), Ok(many));
        let result = run(&c).await.into_result().unwrap();
        assert_eq!(result.image_urls.len(), MAX_IMAGE_URLS);
    }

    #[tokio::test]
    async fn missing_query_skips_search() {
        let (c, search) = services(
            Ok("text"),
            Ok(r#"{"summary":"S","flashcards":[]}"#),
            Ok(vec!["http://never".into()]),
        );
        let result = run(&c).await.into_result().unwrap();
        assert!(result.search_query.is_none());
        assert!(result.image_urls.is_empty());
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }
}
