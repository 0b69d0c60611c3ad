use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to read metadata: {0}")]
    MetadataError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF metadata backends.
///
/// Implementors only read the document-info dictionary; placeholder
/// filtering and the file-name fallback live in [`crate::title`].
pub trait PdfMetadataBackend: Send + Sync {
    /// Raw document-info Title of a PDF file, `None` when the field is absent.
    fn title(&self, path: &Path) -> Result<Option<String>, BackendError>;
}
