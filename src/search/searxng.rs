//! SearXNG 搜索（GET {SEARXNG_URL}/search?format=json）

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::search::{PageFetcher, SearchBackend, SearchError, SearchHit};

const PROVIDER: &str = "searxng";

pub struct SearxngSearch {
    client: Client,
    fetcher: PageFetcher,
    base_url: String,
}

impl SearxngSearch {
    pub fn new(client: Client, fetcher: PageFetcher, base_url: &str) -> Self {
        Self {
            client,
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

pub(crate) fn parse_results(payload: &Value, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
    let results = payload
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SearchError::Parse {
            provider: PROVIDER,
            message: "missing results array".to_string(),
        })?;

    Ok(results
        .iter()
        .filter_map(|row| {
            let url = row.get("url").and_then(|v| v.as_str())?.trim();
            if url.is_empty() {
                return None;
            }
            let title = row.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled");
            let content = row.get("content").and_then(|v| v.as_str()).unwrap_or_default();
            Some(SearchHit::new(title, url, content))
        })
        .take(max_results)
        .collect())
}

#[async_trait]
impl SearchBackend for SearxngSearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(self.search_url())
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| SearchError::Request {
                provider: PROVIDER,
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(SearchError::Status {
                provider: PROVIDER,
                status: response.status().as_u16(),
            });
        }
        let payload: Value = response.json().await.map_err(|e| SearchError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        let mut hits = parse_results(&payload, max_results)?;
        if fetch_full_page {
            self.fetcher.enrich(&mut hits).await;
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results_limits_count() {
        let payload = json!({
            "results": [
                {"url": "https://a.com", "title": "A", "content": "a"},
                {"url": "https://b.com", "title": "B", "content": "b"},
                {"url": "https://c.com", "title": "C", "content": "c"},
                {"url": "https://d.com", "title": "D", "content": "d"}
            ]
        });
        let hits = parse_results(&payload, 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[2].url, "https://c.com");
    }

    #[test]
    fn test_search_url() {
        let backend = SearxngSearch::new(Client::new(), PageFetcher::new(Client::new()), "http://localhost:8888/");
        assert_eq!(backend.search_url(), "http://localhost:8888/search");
    }
}
