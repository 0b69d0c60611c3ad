//! Markdown citation lines for resolved papers.

use crate::PaperMetadata;

/// Formatting knobs for [`render_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub author_separator: String,
    /// Keep only letters, digits, '-' and ' ' in the rendered title.
    pub strip_title_punctuation: bool,
    /// Append `, Cited By: <n>` when the service reported a count.
    pub show_citation_count: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            author_separator: ", ".to_string(),
            strip_title_punctuation: false,
            show_citation_count: true,
        }
    }
}

/// Best link for a paper: DOI, then arXiv, then the service's own page.
pub fn paper_url(metadata: &PaperMetadata) -> String {
    if let Some(doi) = metadata.doi.as_deref().filter(|d| !d.is_empty()) {
        return format!("https://doi.org/{}", doi);
    }
    if let Some(id) = metadata.arxiv_id.as_deref().filter(|a| !a.is_empty()) {
        return format!("https://arxiv.org/abs/{}", id);
    }
    metadata.url.clone().unwrap_or_default()
}

fn display_title(title: &str, strip: bool) -> String {
    if !strip {
        return title.to_string();
    }
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == ' ')
        .collect()
}

/// Render `- [<title>](<url>) - <authors>, <venue>, (<year>)[, Cited By: <n>]`.
///
/// An empty venue drops its segment; a missing year renders as `(n.d.)`.
pub fn render_line(metadata: &PaperMetadata, options: &RenderOptions) -> String {
    let mut line = format!(
        "- [{}]({}) - {}",
        display_title(&metadata.title, options.strip_title_punctuation),
        paper_url(metadata),
        metadata.authors.join(&options.author_separator),
    );

    let venue = metadata.venue.trim();
    if !venue.is_empty() {
        line.push_str(", ");
        line.push_str(venue);
    }

    match metadata.year {
        Some(year) => line.push_str(&format!(", ({})", year)),
        None => line.push_str(", (n.d.)"),
    }

    if options.show_citation_count
        && let Some(count) = metadata.citation_count
    {
        line.push_str(&format!(", Cited By: {}", count));
    }
    line
}
