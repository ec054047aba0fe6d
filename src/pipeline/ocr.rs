//! OCR: extract text from a rendered page image.
//!
//! The production engine is the `tesseract` command-line tool, run as a child
//! process. The child is spawned with `kill_on_drop`, so a page task that is
//! cancelled by its timeout also terminates the OCR process.

use crate::error::ServiceError;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Turns an image into text.
pub trait TextRecognizer: Send + Sync {
    /// Recognise the text in `image_path` using the given language code.
    ///
    /// `Ok("")` means the engine ran and found no text; `Err` means the
    /// engine could not run or crashed.
    fn recognize<'a>(
        &'a self,
        image_path: &'a Path,
        language: &'a str,
    ) -> BoxFuture<'a, Result<String, ServiceError>>;
}

/// [`TextRecognizer`] that shells out to `tesseract <image> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
        }
    }
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific tesseract executable.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether the executable can be launched at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .is_ok()
    }
}

impl TextRecognizer for TesseractOcr {
    fn recognize<'a>(
        &'a self,
        image_path: &'a Path,
        language: &'a str,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        Box::pin(async move {
            let output = Command::new(&self.binary)
                .arg(image_path)
                .arg("stdout")
                .arg("-l")
                .arg(language)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| {
                    ServiceError::new(format!(
                        "failed to run '{}': {}",
                        self.binary.display(),
                        e
                    ))
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ServiceError::new(format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }

            let text = String::from_utf8_lossy(&output.stdout).into_owned();
            debug!(
                "OCR on {} produced {} chars",
                image_path.display(),
                text.len()
            );
            Ok(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_a_service_error() {
        let ocr = TesseractOcr::with_binary("/definitely/not/tesseract");
        assert!(!ocr.is_available().await);
        let err = ocr
            .recognize(Path::new("page_1.png"), "eng")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to run"), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_image_and_language_to_the_engine() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-tesseract");
        std::fs::write(&script, "#!/bin/sh\necho \"text of $1 in $4\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let ocr = TesseractOcr::with_binary(&script);
        let text = ocr
            .recognize(Path::new("page_2.png"), "deu")
            .await
            .unwrap();
        assert_eq!(text.trim(), "text of page_2.png in deu");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_service_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("broken-tesseract");
        std::fs::write(&script, "#!/bin/sh\necho 'bad image' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = TesseractOcr::with_binary(&script)
            .recognize(Path::new("x.png"), "eng")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad image"), "got: {err}");
    }
}
