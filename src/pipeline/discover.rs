//! Input discovery: find the PDFs to process and validate each one.
//!
//! Only the top level of the configured directory is scanned. Files are
//! returned sorted by path so a batch always runs in the same order.

use crate::error::StudyError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether `path` has a `.pdf` extension (any case).
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// List the PDF files directly inside `dir`.
///
/// A missing or unreadable directory yields an empty list; the batch driver
/// treats that the same as a directory without PDFs.
pub fn find_pdfs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_pdf_path(p))
        .collect();
    pdfs.sort();
    pdfs
}

/// Check that `path` exists, is readable and starts with the `%PDF` magic.
pub fn validate_pdf(path: &Path) -> Result<(), StudyError> {
    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(_) => {
            return Err(StudyError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
    };

    let mut magic = [0u8; 4];
    if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(StudyError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated PDF: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_pdf_path(Path::new("a.pdf")));
        assert!(is_pdf_path(Path::new("B.PDF")));
        assert!(!is_pdf_path(Path::new("notes.txt")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn finds_top_level_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"# hi").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.pdf"), b"%PDF-1.4").unwrap();

        let found: Vec<String> = find_pdfs(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        assert!(find_pdfs(Path::new("/definitely/not/a/dir")).is_empty());
    }

    #[test]
    fn rejects_non_pdf_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"PK\x03\x04zip").unwrap();
        let err = validate_pdf(&path).unwrap_err();
        assert!(matches!(err, StudyError::NotAPdf { magic, .. } if &magic == b"PK\x03\x04"));
    }

    #[test]
    fn accepts_pdf_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        assert!(validate_pdf(&path).is_ok());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = validate_pdf(Path::new("/nope/missing.pdf")).unwrap_err();
        assert!(matches!(err, StudyError::FileNotFound { .. }));
    }
}
