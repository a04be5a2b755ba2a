//! 研究状态与最终结果
//!
//! ResearchState 由一次运行独占；两条累积序列只能通过 record_iteration 成对追加，
//! 因此第 k 轮开始时两者长度与 loop_count 都等于 k-1。

use serde::Serialize;

/// 单次运行的可变状态
#[derive(Debug, Clone)]
pub struct ResearchState {
    topic: String,
    current_query: Option<String>,
    loop_count: u32,
    research_results: Vec<String>,
    gathered_sources: Vec<String>,
    summary: Option<String>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            current_query: None,
            loop_count: 0,
            research_results: Vec::new(),
            gathered_sources: Vec::new(),
            summary: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn current_query(&self) -> Option<&str> {
        self.current_query.as_deref()
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.current_query = Some(query.into());
    }

    /// 已完成的搜索轮数
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn research_results(&self) -> &[String] {
        &self.research_results
    }

    pub fn gathered_sources(&self) -> &[String] {
        &self.gathered_sources
    }

    /// 最近一轮的格式化结果
    pub fn latest_research_result(&self) -> Option<&str> {
        self.research_results.last().map(String::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    /// 记录一轮搜索：成对追加结果与来源，轮数 +1（失败的轮次同样计数）
    pub fn record_iteration(&mut self, research_result: String, sources: String) {
        self.research_results.push(research_result);
        self.gathered_sources.push(sources);
        self.loop_count += 1;
    }
}

/// 一次运行的终态结果，由 Finalizer 生成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchOutcome {
    pub success: bool,
    pub final_summary: Option<String>,
    pub source_urls: Vec<String>,
    pub error_reason: Option<String>,
}

impl ResearchOutcome {
    /// 调用方合成的失败结果（超时、内部错误），不带摘要与来源
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            final_summary: None,
            source_urls: Vec::new(),
            error_reason: Some(reason.into()),
        }
    }
}
