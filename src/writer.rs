//! Result writer: persist one PDF's output and its projections.
//!
//! Layout:
//!
//! ```text
//! <results_folder>/output.json
//! <summary_folder>/summaries.json
//! <flashcard_folder>/flashcards.json
//! <query_folder>/search_queries.json
//! ```
//!
//! An existing results folder is deleted recursively before writing, but only
//! when `replace_results` is set; otherwise the write is refused.

use crate::config::PipelineConfig;
use crate::error::StudyError;
use crate::output::{PdfOutput, Projections};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::path::Path;
use tracing::{debug, info};

/// Write the four JSON documents, replacing a previous run's results.
pub async fn save_results(
    output: &PdfOutput,
    projections: &Projections,
    config: &PipelineConfig,
) -> Result<(), StudyError> {
    let results_dir = &config.results_dir;

    if results_dir.exists() {
        if !config.replace_results {
            return Err(StudyError::ResultsExist {
                path: results_dir.clone(),
            });
        }
        info!("Replacing existing results in {}", results_dir.display());
        tokio::fs::remove_dir_all(results_dir)
            .await
            .map_err(|e| StudyError::OutputWriteFailed {
                path: results_dir.clone(),
                source: e,
            })?;
    }

    for dir in [
        &config.results_dir,
        &config.summary_dir,
        &config.flashcard_dir,
        &config.query_dir,
    ] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StudyError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;
    }

    write_json(&config.results_dir.join("output.json"), output).await?;
    write_json(&config.summary_dir.join("summaries.json"), &projections.summaries).await?;
    write_json(&config.flashcard_dir.join("flashcards.json"), &projections.flashcards).await?;
    write_json(&config.query_dir.join("search_queries.json"), &projections.queries).await?;

    info!(
        "Results saved successfully ({} pages) to {}",
        output.pages.len(),
        config.results_dir.display()
    );
    Ok(())
}

/// Serialise with four-space indentation and write to `path`.
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StudyError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| StudyError::SerializeFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    tokio::fs::write(path, &buf)
        .await
        .map_err(|e| StudyError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    debug!("Wrote {} ({} bytes)", path.display(), buf.len());
    Ok(())
}
