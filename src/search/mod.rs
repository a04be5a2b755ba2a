//! 搜索后端：统一契约 + 四种可互换实现（Tavily / Perplexity / DuckDuckGo / SearXNG）
//!
//! 编排器只通过 SearchBackend 调用后端，不关心具体是哪一个；
//! 后端选择在运行开始前解析（SearchApi::from_str），未知标识为致命配置错误。

pub mod duckduckgo;
pub mod fetch;
pub mod mock;
pub mod perplexity;
pub mod searxng;
pub mod tavily;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SearchSection;
use crate::core::ResearchError;

pub use duckduckgo::DuckDuckGoSearch;
pub use fetch::PageFetcher;
pub use mock::MockSearch;
pub use perplexity::PerplexitySearch;
pub use searxng::SearxngSearch;
pub use tavily::TavilySearch;

/// 单条搜索结果；raw_content 为整页正文（仅在抓取整页时填充）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub raw_content: Option<String>,
}

impl SearchHit {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            raw_content: None,
        }
    }

    pub fn with_raw_content(mut self, raw: impl Into<String>) -> Self {
        self.raw_content = Some(raw.into());
        self
    }
}

/// 后端调用失败；编排器将其记为该轮的哨兵条目，不中断运行
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Missing API key: {0}")]
    MissingApiKey(&'static str),

    #[error("{provider} request failed: {message}")]
    Request { provider: &'static str, message: String },

    #[error("{provider} returned HTTP {status}")]
    Status { provider: &'static str, status: u16 },

    #[error("{provider} response could not be parsed: {message}")]
    Parse { provider: &'static str, message: String },
}

/// 搜索后端契约：给定查询、结果数、是否抓整页，返回有序结果或错误
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError>;
}

/// 可选的搜索后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchApi {
    Tavily,
    Perplexity,
    DuckDuckGo,
    Searxng,
}

impl SearchApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchApi::Tavily => "tavily",
            SearchApi::Perplexity => "perplexity",
            SearchApi::DuckDuckGo => "duckduckgo",
            SearchApi::Searxng => "searxng",
        }
    }

    /// 每轮请求的结果数
    pub fn max_results(&self) -> usize {
        match self {
            SearchApi::Tavily => 1,
            SearchApi::Perplexity => 1,
            SearchApi::DuckDuckGo => 3,
            SearchApi::Searxng => 3,
        }
    }
}

impl fmt::Display for SearchApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchApi {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tavily" => Ok(SearchApi::Tavily),
            "perplexity" => Ok(SearchApi::Perplexity),
            "duckduckgo" => Ok(SearchApi::DuckDuckGo),
            "searxng" => Ok(SearchApi::Searxng),
            _ => Err(ResearchError::UnsupportedSearchApi(s.to_string())),
        }
    }
}

/// 共享 HTTP Client：超时 + 浏览器 UA
pub(crate) fn http_client(timeout_secs: u64) -> Client {
    // 使用现代浏览器 UA，避免被站点识别为爬虫
    const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// 按选择创建后端；凭据缺失不在这里报错，而是在调用时作为后端失败记录
pub fn create_search_backend(api: SearchApi, cfg: &SearchSection) -> Arc<dyn SearchBackend> {
    let client = http_client(cfg.timeout_secs);
    let fetcher = PageFetcher::new(client.clone());
    match api {
        SearchApi::Tavily => Arc::new(TavilySearch::new(client, cfg.tavily_api_key.clone())),
        SearchApi::Perplexity => {
            Arc::new(PerplexitySearch::new(client, cfg.perplexity_api_key.clone()))
        }
        SearchApi::DuckDuckGo => Arc::new(DuckDuckGoSearch::new(client, fetcher)),
        SearchApi::Searxng => Arc::new(SearxngSearch::new(client, fetcher, &cfg.searxng_url)),
    }
}

/// 非空的 API key
pub(crate) fn require_key(key: &Option<String>, name: &'static str) -> Result<String, SearchError> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .ok_or(SearchError::MissingApiKey(name))
}
