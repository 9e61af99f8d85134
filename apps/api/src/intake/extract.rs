//! Extractor: PDF on local disk to plain text.
//!
//! Extraction is deliberately permissive at the page level: a page whose text
//! cannot be decoded contributes an empty segment instead of failing the
//! document. Only document-level faults (unreadable file, corrupt structure,
//! zero pages, no text at all) are errors.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to load PDF '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("PDF has no pages")]
    NoPages,

    #[error("PDF contains no extractable text")]
    NoText,

    #[error("PDF decoder panicked: {0}")]
    Panicked(String),

    #[error("PDF decoder task was cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Keeps the panic message when the decoder task panicked.
    pub fn from_join_error(e: tokio::task::JoinError) -> Self {
        if !e.is_panic() {
            return ExtractionError::Cancelled;
        }
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        ExtractionError::Panicked(message)
    }
}

/// Extracts the text of every page of the PDF at `path`, in page order.
/// Decoding runs on the blocking pool; a decoder panic or cancellation is reported as an error.
pub async fn extract(path: &Path) -> Result<String, ExtractionError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&path))
        .await
        .map_err(ExtractionError::from_join_error)?
}

pub fn extract_blocking(path: &Path) -> Result<String, ExtractionError> {
    let doc = Document::load(path).map_err(|source| ExtractionError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractionError::NoPages);
    }
    debug!("Extracting text from {} page(s)", pages.len());

    // BTreeMap keys iterate in page-number order.
    let text = join_pages(
        pages
            .keys()
            .map(|&page_number| (page_number, doc.extract_text(&[page_number]))),
    );

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }
    Ok(text)
}

/// Concatenates per-page results in the order given. Failed pages become
/// empty segments.
pub fn join_pages<E, I>(pages: I) -> String
where
    E: Display,
    I: IntoIterator<Item = (u32, Result<String, E>)>,
{
    let mut text = String::new();
    for (page_number, result) in pages {
        match result {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!("Failed to extract text from page {page_number}: {e}"),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_pdf, write_zero_page_pdf};

    #[test]
    fn test_join_pages_keeps_order() {
        let pages: Vec<(u32, Result<String, String>)> = vec![
            (1, Ok("first ".to_string())),
            (2, Ok("second ".to_string())),
            (3, Ok("third".to_string())),
        ];
        assert_eq!(join_pages(pages), "first second third");
    }

    #[test]
    fn test_join_pages_failed_page_is_empty_segment() {
        let pages: Vec<(u32, Result<String, String>)> = vec![
            (1, Ok("a".to_string())),
            (2, Err("bad content stream".to_string())),
            (3, Ok("c".to_string())),
        ];
        assert_eq!(join_pages(pages), "ac");
    }

    #[test]
    fn test_join_pages_all_failed_is_empty() {
        let pages: Vec<(u32, Result<String, String>)> = vec![(1, Err("x".to_string()))];
        assert_eq!(join_pages(pages), "");
    }

    #[test]
    fn test_extract_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.pdf");
        write_pdf(&path, &["Skills: Python, SQL. GPA: 8.5. B.Tech."]);

        let text = extract_blocking(&path).unwrap();
        assert!(text.contains("Skills: Python, SQL."), "got: {text:?}");
        assert!(text.contains("B.Tech."), "got: {text:?}");
    }

    #[tokio::test]
    async fn test_extract_multi_page_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three.pdf");
        write_pdf(&path, &["Alpha", "Bravo", "Charlie"]);

        let text = extract(&path).await.unwrap();
        let a = text.find("Alpha").unwrap();
        let b = text.find("Bravo").unwrap();
        let c = text.find("Charlie").unwrap();
        assert!(a < b && b < c, "pages out of order: {text:?}");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        let err = extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Load { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(&dir.path().join("absent.pdf")).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Load { .. }));
    }

    #[tokio::test]
    async fn test_zero_page_pdf_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pdf");
        write_zero_page_pdf(&path);

        let err = extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoPages));
    }

    #[tokio::test]
    async fn test_decoder_panic_keeps_message() {
        let join_err = tokio::task::spawn_blocking::<_, ()>(|| panic!("boom"))
            .await
            .unwrap_err();

        let err = ExtractionError::from_join_error(join_err);
        assert!(
            matches!(&err, ExtractionError::Panicked(msg) if msg == "boom"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_formatted_panic_message_is_kept() {
        let page = 7;
        let join_err = tokio::task::spawn_blocking::<_, ()>(move || panic!("bad page {page}"))
            .await
            .unwrap_err();

        let err = ExtractionError::from_join_error(join_err);
        assert!(
            matches!(&err, ExtractionError::Panicked(msg) if msg == "bad page 7"),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_aborted_task_is_cancelled_not_panicked() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let join_err = handle.await.unwrap_err();

        let err = ExtractionError::from_join_error(join_err);
        assert!(matches!(err, ExtractionError::Cancelled), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_blank_pages_are_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        write_pdf(&path, &["", ""]);

        let err = extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoText));
    }
}
