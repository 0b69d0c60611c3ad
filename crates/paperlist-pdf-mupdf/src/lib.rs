use std::path::Path;

use mupdf::{Document, MetadataName};

use paperlist_core::{BackendError, PdfMetadataBackend};

/// MuPDF-based implementation of [`PdfMetadataBackend`].
///
/// Keeps the AGPL `mupdf` dependency out of `paperlist-core`. Only the
/// document-info dictionary is read; page content is never parsed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfMetadataBackend for MupdfBackend {
    fn title(&self, path: &Path) -> Result<Option<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let title = document
            .metadata(MetadataName::Title)
            .map_err(|e| BackendError::MetadataError(e.to_string()))?;

        if title.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(title))
        }
    }
}
