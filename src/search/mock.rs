//! Mock 搜索后端（用于测试，无网络）
//!
//! 按调用顺序弹出预置结果，耗尽后返回默认结果；记录每次收到的查询。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::search::{SearchBackend, SearchError, SearchHit};

pub struct MockSearch {
    script: Mutex<VecDeque<Result<Vec<SearchHit>, SearchError>>>,
    default_result: Result<Vec<SearchHit>, SearchError>,
    queries: Mutex<Vec<(String, usize, bool)>>,
}

impl Default for MockSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearch {
    /// 默认返回空结果
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_result: Ok(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// 每次都失败的后端
    pub fn failing(err: SearchError) -> Self {
        Self {
            default_result: Err(err),
            ..Self::new()
        }
    }

    pub fn push_hits(self, hits: Vec<SearchHit>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(hits));
        }
        self
    }

    pub fn push_error(self, err: SearchError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(err));
        }
        self
    }

    /// 收到的查询（query, max_results, fetch_full_page）
    pub fn queries(&self) -> Vec<(String, usize, bool)> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        fetch_full_page: bool,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push((query.to_string(), max_results, fetch_full_page));
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.default_result.clone())
    }
}
