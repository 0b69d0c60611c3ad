//! Title extraction: embedded PDF metadata title with a file-name fallback.

use std::path::Path;

use crate::backend::{BackendError, PdfMetadataBackend};

/// Placeholder titles written by authoring tools instead of a real title.
/// Compared after wrapping parentheses are stripped.
const PLACEHOLDER_TITLES: &[&str] = &["none", "untitled"];

/// Both title candidates for one PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTitle {
    /// Cleaned document-info title; empty when missing or a placeholder.
    pub embedded: String,
    /// File name without its extension. Always present.
    pub file: String,
}

/// Read the embedded title of `path` and derive the file-name title.
///
/// Any backend failure (unreadable or corrupt file) is returned to the caller.
pub fn extract_title(
    backend: &dyn PdfMetadataBackend,
    path: &Path,
) -> Result<ExtractedTitle, BackendError> {
    let raw = backend.title(path)?;
    let embedded = raw.as_deref().map(clean_embedded_title).unwrap_or_default();
    Ok(ExtractedTitle {
        embedded,
        file: file_title(path),
    })
}

/// File name with the final extension removed.
pub fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Normalize a raw metadata title, returning an empty string for placeholders.
pub fn clean_embedded_title(raw: &str) -> String {
    let stripped = raw
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim();
    if stripped.is_empty()
        || PLACEHOLDER_TITLES
            .iter()
            .any(|p| stripped.eq_ignore_ascii_case(p))
    {
        return String::new();
    }
    stripped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedTitle(Option<&'static str>);

    impl PdfMetadataBackend for FixedTitle {
        fn title(&self, _path: &Path) -> Result<Option<String>, BackendError> {
            Ok(self.0.map(String::from))
        }
    }

    struct Unreadable;

    impl PdfMetadataBackend for Unreadable {
        fn title(&self, _path: &Path) -> Result<Option<String>, BackendError> {
            Err(BackendError::OpenError("not a PDF".into()))
        }
    }

    #[test]
    fn placeholders_become_empty() {
        for raw in ["", "   ", "()", "None", "(Untitled)", "untitled", "(None)"] {
            assert_eq!(clean_embedded_title(raw), "", "raw = {raw:?}");
        }
    }

    #[test]
    fn wrapping_parentheses_are_stripped() {
        assert_eq!(
            clean_embedded_title("(Deep Residual Learning)"),
            "Deep Residual Learning"
        );
        assert_eq!(
            clean_embedded_title("  Deep Residual Learning  "),
            "Deep Residual Learning"
        );
    }

    #[test]
    fn inner_parentheses_survive() {
        assert_eq!(
            clean_embedded_title("BERT (Bidirectional Encoders) for NLP"),
            "BERT (Bidirectional Encoders) for NLP"
        );
    }

    #[test]
    fn file_title_strips_extension() {
        let path = PathBuf::from("papers/nlp/Attention Is All You Need.pdf");
        assert_eq!(file_title(&path), "Attention Is All You Need");
    }

    #[test]
    fn file_title_keeps_inner_dots() {
        let path = PathBuf::from("GPT-3.5 Technical Report.pdf");
        assert_eq!(file_title(&path), "GPT-3.5 Technical Report");
    }

    #[test]
    fn extract_uses_backend_title() {
        let path = PathBuf::from("x/Some File.pdf");
        let t = extract_title(&FixedTitle(Some("(Real Title)")), &path).unwrap();
        assert_eq!(t.embedded, "Real Title");
        assert_eq!(t.file, "Some File");
    }

    #[test]
    fn extract_missing_title_is_empty() {
        let path = PathBuf::from("Some File.pdf");
        let t = extract_title(&FixedTitle(None), &path).unwrap();
        assert_eq!(t.embedded, "");
        assert_eq!(t.file, "Some File");
    }

    #[test]
    fn extract_propagates_backend_errors() {
        let path = PathBuf::from("broken.pdf");
        assert!(matches!(
            extract_title(&Unreadable, &path),
            Err(BackendError::OpenError(_))
        ));
    }
}
