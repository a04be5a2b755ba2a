//! Perplexity 搜索（POST https://api.perplexity.ai/chat/completions）
//!
//! Perplexity 返回一段综合回答 + 引用列表：第一条引用携带完整回答，其余引用只作标注。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::search::{require_key, SearchBackend, SearchError, SearchHit};

const PROVIDER: &str = "perplexity";
const ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
const MODEL: &str = "sonar-pro";
const DEFAULT_CITATION: &str = "https://perplexity.ai";

pub struct PerplexitySearch {
    client: Client,
    api_key: Option<String>,
}

impl PerplexitySearch {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

/// 将回答与引用展开为 SearchHit 列表
pub(crate) fn parse_response(payload: &Value) -> Result<Vec<SearchHit>, SearchError> {
    let answer = payload
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SearchError::Parse {
            provider: PROVIDER,
            message: "missing choices[0].message.content".to_string(),
        })?;

    let mut citations: Vec<String> = payload
        .get("citations")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|c| c.as_str())
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if citations.is_empty() {
        citations.push(DEFAULT_CITATION.to_string());
    }

    let hits = citations
        .into_iter()
        .enumerate()
        .map(|(i, url)| {
            let title = format!("Perplexity Search, Source {}", i + 1);
            if i == 0 {
                SearchHit::new(title, url, answer).with_raw_content(answer)
            } else {
                SearchHit::new(title, url, "See above for full content")
            }
        })
        .collect();
    Ok(hits)
}

#[async_trait]
impl SearchBackend for PerplexitySearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(
        &self,
        query: &str,
        _max_results: usize,
        _fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let api_key = require_key(&self.api_key, "PERPLEXITY_API_KEY")?;
        let body = json!({
            "model": MODEL,
            "messages": [
                {"role": "system", "content": "Search the web and provide factual information with sources."},
                {"role": "user", "content": query}
            ]
        });

        let response = self
            .client
            .post(ENDPOINT)
            .bearer_auth(api_key)
            .json(&body)
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
        parse_response(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_citation_carries_answer() {
        let payload = json!({
            "choices": [{"message": {"content": "Rust is a systems language."}}],
            "citations": ["https://rust-lang.org", "https://doc.rust-lang.org"]
        });
        let hits = parse_response(&payload).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://rust-lang.org");
        assert_eq!(hits[0].raw_content.as_deref(), Some("Rust is a systems language."));
        assert_eq!(hits[1].content, "See above for full content");
        assert_eq!(hits[1].title, "Perplexity Search, Source 2");
    }

    #[test]
    fn test_missing_citations_defaults() {
        let payload = json!({"choices": [{"message": {"content": "answer"}}]});
        let hits = parse_response(&payload).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, DEFAULT_CITATION);
    }

    #[test]
    fn test_missing_answer_is_parse_error() {
        assert!(parse_response(&json!({"choices": []})).is_err());
    }
}
