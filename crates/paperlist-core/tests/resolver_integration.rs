//! End-to-end resolution over a real directory tree and an on-disk cache,
//! with a scripted lookup service and a stub PDF reader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use paperlist_core::lookup::mock::{MockLookup, MockResponse};
use paperlist_core::{
    BackendError, ErrorKind, PaperMetadata, PdfMetadataBackend, ResolutionCache, Resolver,
    scan_collection,
};

/// Embedded titles keyed by file name; anything else has no title.
#[derive(Default)]
struct StubPdf(HashMap<String, String>);

impl StubPdf {
    fn with(mut self, file_name: &str, title: &str) -> Self {
        self.0.insert(file_name.to_string(), title.to_string());
        self
    }
}

impl PdfMetadataBackend for StubPdf {
    fn title(&self, path: &Path) -> Result<Option<String>, BackendError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.0.get(&name).cloned())
    }
}

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"%PDF-1.4").unwrap();
}

fn attention() -> PaperMetadata {
    PaperMetadata {
        title: "Attention Is All You Need".into(),
        authors: vec!["Ashish Vaswani".into(), "Noam Shazeer".into()],
        venue: "NeurIPS".into(),
        year: Some(2017),
        arxiv_id: Some("1706.03762".into()),
        citation_count: Some(100000),
        ..Default::default()
    }
}

fn resolver(pdf: StubPdf, mock: &Arc<MockLookup>, cache_path: &Path, refresh: bool) -> Resolver {
    let cache = ResolutionCache::open(cache_path, refresh).unwrap();
    Resolver::new(Arc::new(pdf), mock.clone(), cache)
}

#[tokio::test]
async fn embedded_title_match_yields_citation_line() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf_path = tmp.path().join("nlp/vaswani2017.pdf");
    touch(&pdf_path);
    let mock = Arc::new(
        MockLookup::new(MockResponse::NotFound)
            .with("attention is all you need", MockResponse::Found(attention())),
    );
    let pdf = StubPdf::default().with("vaswani2017.pdf", "ATTENTION IS ALL YOU NEED");
    let mut r = resolver(pdf, &mock, &tmp.path().join("cache.json"), false);

    let record = r.resolve(&pdf_path).await.unwrap();
    assert_eq!(record.title_from_file, "ATTENTION IS ALL YOU NEED");
    assert_eq!(
        record.rendered_line,
        "- [Attention Is All You Need](https://arxiv.org/abs/1706.03762) - \
         Ashish Vaswani, Noam Shazeer, NeurIPS, (2017), Cited By: 100000"
    );
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn fallback_records_file_name_as_key() {
    let tmp = tempfile::tempdir().unwrap();
    let mismatched = tmp.path().join("Graph Attention Networks.pdf");
    let untitled = tmp.path().join("Neural Ordinary Differential Equations.pdf");
    touch(&mismatched);
    touch(&untitled);
    let mock = Arc::new(
        MockLookup::new(MockResponse::NotFound)
            .with("main.tex", MockResponse::found("Something Unrelated", 2001))
            .with(
                "Graph Attention Networks",
                MockResponse::found("Graph Attention Networks", 2018),
            )
            .with(
                "Neural Ordinary Differential Equations",
                MockResponse::found("Neural Ordinary Differential Equations", 2018),
            ),
    );
    let pdf = StubPdf::default()
        .with("Graph Attention Networks.pdf", "main.tex")
        .with("Neural Ordinary Differential Equations.pdf", "(Untitled)");
    let mut r = resolver(pdf, &mock, &tmp.path().join("cache.json"), false);

    let first = r.resolve(&mismatched).await.unwrap();
    let second = r.resolve(&untitled).await.unwrap();
    assert_eq!(first.title_from_file, "Graph Attention Networks");
    assert_eq!(second.title_from_file, "Neural Ordinary Differential Equations");
    // Placeholder title is never sent to the service
    assert_eq!(
        mock.calls(),
        vec![
            "main.tex",
            "Graph Attention Networks",
            "Neural Ordinary Differential Equations"
        ]
    );
}

#[tokio::test]
async fn second_resolution_is_served_from_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let pdf_path = tmp.path().join("paper.pdf");
    touch(&pdf_path);
    let mock = Arc::new(MockLookup::new(MockResponse::Found(attention())));
    let mut r = resolver(StubPdf::default(), &mock, &tmp.path().join("cache.json"), false);

    let first = r.resolve(&pdf_path).await.unwrap();
    let second = r.resolve(&pdf_path).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn restart_resumes_from_persisted_cache() {
    let tmp = tempfile::tempdir().unwrap();
    let cache_path = tmp.path().join("state/cache.json");
    let papers: Vec<PathBuf> = ["one", "two", "three"]
        .iter()
        .map(|n| tmp.path().join(format!("lit/{}.pdf", n)))
        .collect();
    for p in &papers {
        touch(p);
    }

    // First run stops after two papers
    let first_run = Arc::new(MockLookup::new(MockResponse::found("Any Paper", 2020)));
    {
        let mut r = resolver(StubPdf::default(), &first_run, &cache_path, false);
        r.resolve(&papers[0]).await.unwrap();
        r.resolve(&papers[1]).await.unwrap();
    }
    assert_eq!(first_run.call_count(), 2);

    let second_run = Arc::new(MockLookup::new(MockResponse::found("Any Paper", 2020)));
    let mut r = resolver(StubPdf::default(), &second_run, &cache_path, false);
    assert_eq!(r.cache().len(), 2);
    for p in &papers {
        r.resolve(p).await.unwrap();
    }
    assert_eq!(second_run.calls(), vec!["three"]);
    assert_eq!(r.cache().len(), 3);
}

#[tokio::test]
async fn refresh_requeries_cached_papers() {
    let tmp = tempfile::tempdir().unwrap();
    let cache_path = tmp.path().join("cache.json");
    let pdf_path = tmp.path().join("paper.pdf");
    touch(&pdf_path);

    let mock = Arc::new(MockLookup::new(MockResponse::found("Paper", 2020)));
    resolver(StubPdf::default(), &mock, &cache_path, false)
        .resolve(&pdf_path)
        .await
        .unwrap();

    let updated = Arc::new(MockLookup::new(MockResponse::found("Paper", 2021)));
    let mut r = resolver(StubPdf::default(), &updated, &cache_path, true);
    let record = r.resolve(&pdf_path).await.unwrap();
    assert_eq!(updated.call_count(), 1);
    assert_eq!(record.metadata.year, Some(2021));

    // The refreshed record replaced the old file contents
    let reopened = ResolutionCache::open(&cache_path, false).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.records()[0].metadata.year, Some(2021));
}

#[tokio::test]
async fn batch_over_scanned_tree_groups_and_reports_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("papers");
    touch(&root.join("A/B/first.pdf"));
    touch(&root.join("A/B/second.pdf"));
    touch(&root.join("A/C/third.pdf"));
    touch(&root.join("D/lost.pdf"));

    let mock = Arc::new(
        MockLookup::new(MockResponse::NotFound)
            .with("first", MockResponse::found("First", 2020))
            .with("second", MockResponse::found("Second", 2019))
            .with("third", MockResponse::Transport("timed out".into()))
            .with("lost", MockResponse::NotFound),
    );
    let mut r = resolver(StubPdf::default(), &mock, &tmp.path().join("cache.json"), false);

    let dirs = scan_collection(&root).unwrap();
    let outcome = r.resolve_all(dirs, |_| {}).await;

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].category, vec!["A", "B"]);
    assert_eq!(outcome.groups[0].papers.len(), 2);

    let kinds: Vec<ErrorKind> = outcome.failures.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::Lookup, ErrorKind::NotFound]);
    assert!(outcome.failures[1].path.ends_with("D/lost.pdf"));
    assert_eq!(r.cache().len(), 2);
}
