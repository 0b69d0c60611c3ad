use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{LookupBackend, LookupError, LookupOutcome};
use crate::PaperMetadata;
use crate::rate_limit::check_rate_limit_response;

pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const DETAIL_FIELDS: &str = "title,authors,venue,year,externalIds,url,citationCount";

pub struct SemanticScholar {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl SemanticScholar {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn search_url(&self, title: &str) -> String {
        format!(
            "{}/paper/search?query={}&limit=1&fields=paperId,title",
            self.base_url,
            urlencoding::encode(title)
        )
    }

    fn detail_url(&self, paper_id: &str) -> String {
        format!(
            "{}/paper/{}?fields={}",
            self.base_url,
            urlencoding::encode(paper_id),
            DETAIL_FIELDS
        )
    }

    async fn get_json(
        &self,
        url: &str,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<serde_json::Value, LookupError> {
        let mut req = client
            .get(url)
            .header("User-Agent", concat!("paperlist/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);

        if let Some(ref key) = self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req.send().await?;
        check_rate_limit_response(&resp)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Service(format!("HTTP {}", status)));
        }

        Ok(resp.json().await?)
    }
}

impl LookupBackend for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<LookupOutcome, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            let search = self.get_json(&self.search_url(title), client, timeout).await?;
            let Some(paper_id) = top_paper_id(&search) else {
                tracing::debug!(title, "no search results");
                return Ok(LookupOutcome::NotFound);
            };

            let details = match self
                .get_json(&self.detail_url(&paper_id), client, timeout)
                .await
            {
                Ok(details) => details,
                Err(e @ LookupError::RateLimited { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(title, paper_id = %paper_id, error = %e, "failed to fetch paper details");
                    return Ok(LookupOutcome::NotFound);
                }
            };

            match parse_paper_details(&details) {
                Some(metadata) => Ok(LookupOutcome::Found(metadata)),
                None => {
                    tracing::warn!(title, paper_id = %paper_id, "paper details had no title");
                    Ok(LookupOutcome::NotFound)
                }
            }
        })
    }
}

/// Id of the top-ranked search hit, `None` when the search returned nothing.
pub fn top_paper_id(search: &serde_json::Value) -> Option<String> {
    if search["total"].as_u64() == Some(0) {
        return None;
    }
    search["data"]
        .as_array()?
        .first()?
        .get("paperId")?
        .as_str()
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Map a Graph API paper object to [`PaperMetadata`].
pub fn parse_paper_details(item: &serde_json::Value) -> Option<PaperMetadata> {
    let title = item["title"].as_str().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let authors: Vec<String> = item["authors"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let external = &item["externalIds"];
    let non_empty = |v: &serde_json::Value| v.as_str().filter(|s| !s.is_empty()).map(String::from);

    Some(PaperMetadata {
        title: title.to_string(),
        authors,
        venue: item["venue"].as_str().unwrap_or("").to_string(),
        year: item["year"].as_i64().and_then(|y| i32::try_from(y).ok()),
        doi: non_empty(&external["DOI"]),
        arxiv_id: non_empty(&external["ArXiv"]),
        url: non_empty(&item["url"]),
        citation_count: item["citationCount"].as_u64(),
        paper_id: non_empty(&item["paperId"]),
    })
}
