//! Tavily 搜索（POST https://api.tavily.com/search）
//!
//! 整页内容由 Tavily 直接返回（include_raw_content），无需二次抓取。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::search::{require_key, SearchBackend, SearchError, SearchHit};

const PROVIDER: &str = "tavily";
const ENDPOINT: &str = "https://api.tavily.com/search";

pub struct TavilySearch {
    client: Client,
    api_key: Option<String>,
}

impl TavilySearch {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

/// 解析 Tavily 响应中的 results 数组；缺少 url 的条目跳过
pub(crate) fn parse_results(payload: &Value, fetch_full_page: bool) -> Result<Vec<SearchHit>, SearchError> {
    let results = payload
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| SearchError::Parse {
            provider: PROVIDER,
            message: "missing results array".to_string(),
        })?;

    let hits = results
        .iter()
        .filter_map(|row| {
            let url = row.get("url").and_then(|v| v.as_str())?.trim();
            if url.is_empty() {
                return None;
            }
            let title = row.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled");
            let content = row.get("content").and_then(|v| v.as_str()).unwrap_or_default();
            let raw_content = if fetch_full_page {
                row.get("raw_content").and_then(|v| v.as_str()).map(String::from)
            } else {
                None
            };
            Some(SearchHit {
                title: title.to_string(),
                url: url.to_string(),
                content: content.to_string(),
                raw_content,
            })
        })
        .collect();
    Ok(hits)
}

#[async_trait]
impl SearchBackend for TavilySearch {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let api_key = require_key(&self.api_key, "TAVILY_API_KEY")?;
        let body = json!({
            "query": query,
            "search_depth": "basic",
            "max_results": max_results,
            "include_answer": false,
            "include_raw_content": fetch_full_page,
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
        parse_results(&payload, fetch_full_page)
    }
}
