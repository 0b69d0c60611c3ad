//! Collection scanning: one group of PDFs per directory, in path order.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("collection root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// PDFs found directly inside one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDirectory {
    /// Path segments relative to the collection root; empty for the root itself.
    pub category: Vec<String>,
    /// PDF files, sorted by path.
    pub pdfs: Vec<PathBuf>,
}

/// A `.pdf` file. The extension match is case-sensitive.
fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "pdf")
}

/// Walk `root` and return every directory that directly contains a PDF.
///
/// Directories are visited depth-first with children sorted by name, so
/// `A`, `A/B`, `A/C`, `B` come out in that order. Symlinked directories are
/// not followed.
pub fn scan_collection(root: &Path) -> Result<Vec<ScannedDirectory>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    tracing::debug!(
        root = %root.display(),
        directories = out.len(),
        pdfs = out.iter().map(|d| d.pdfs.len()).sum::<usize>(),
        "scanned collection"
    );
    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<ScannedDirectory>) -> Result<(), ScanError> {
    let read_err = |source| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut subdirs = Vec::new();
    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let file_type = entry.file_type().map_err(read_err)?;
        let path = entry.path();
        if file_type.is_dir() {
            subdirs.push(path);
        } else if is_pdf(&path) {
            pdfs.push(path);
        }
    }
    subdirs.sort();
    pdfs.sort();

    if !pdfs.is_empty() {
        out.push(ScannedDirectory {
            category: category_of(root, dir),
            pdfs,
        });
    }
    for sub in subdirs {
        walk(root, &sub, out)?;
    }
    Ok(())
}

fn category_of(root: &Path, dir: &Path) -> Vec<String> {
    dir.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"%PDF-1.4").unwrap();
    }

    fn names(dir: &ScannedDirectory) -> Vec<String> {
        dir.pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn groups_by_directory_in_path_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("B/z.pdf"));
        touch(&root.join("A/C/c.pdf"));
        touch(&root.join("A/B/b2.pdf"));
        touch(&root.join("A/B/b1.pdf"));
        touch(&root.join("A B/space.pdf"));

        let dirs = scan_collection(root).unwrap();
        let categories: Vec<Vec<String>> = dirs.iter().map(|d| d.category.clone()).collect();
        assert_eq!(
            categories,
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["A".to_string(), "C".to_string()],
                vec!["A B".to_string()],
                vec!["B".to_string()],
            ]
        );
        assert_eq!(names(&dirs[0]), vec!["b1.pdf", "b2.pdf"]);
    }

    #[test]
    fn root_level_pdfs_have_empty_category() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("top.pdf"));
        let dirs = scan_collection(tmp.path()).unwrap();
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].category.is_empty());
    }

    #[test]
    fn only_lowercase_pdf_extension_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("x/keep.pdf"));
        touch(&root.join("x/skip.PDF"));
        touch(&root.join("x/notes.txt"));
        touch(&root.join("y/only.PDF"));

        let dirs = scan_collection(root).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(names(&dirs[0]), vec!["keep.pdf"]);
    }

    #[test]
    fn directories_without_pdfs_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("empty/nested")).unwrap();
        assert!(scan_collection(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scan_collection(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }
}
