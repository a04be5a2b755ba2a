//! 研究进度事件（可选推送给流式接口或 CLI）

use serde::Serialize;

/// 状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GenerateQuery,
    WebResearch,
    Summarize,
    Reflect,
    Route,
    Finalize,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::GenerateQuery => "generate_query",
            Stage::WebResearch => "web_research",
            Stage::Summarize => "summarize",
            Stage::Reflect => "reflect",
            Stage::Route => "route",
            Stage::Finalize => "finalize",
            Stage::Done => "done",
        }
    }
}

/// 单次运行的过程事件（JSON 序列化后供 SSE / CLI 展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// 进入某个阶段
    StageStarted {
        stage: Stage,
        loop_count: u32,
    },
    /// 生成（或回退得到）下一轮查询
    QueryGenerated {
        query: String,
        loop_count: u32,
    },
    SearchCompleted {
        query: String,
        hits: usize,
        loop_count: u32,
    },
    /// 搜索后端失败，本轮记为哨兵条目
    SearchFailed {
        query: String,
        error: String,
        loop_count: u32,
    },
    SummaryUpdated {
        chars: usize,
    },
    /// 模型总结失败，摘要保留或置为占位
    SummaryFailed {
        error: String,
    },
    Finished {
        success: bool,
        source_count: usize,
    },
}

impl ResearchEvent {
    /// SSE 事件名
    pub fn name(&self) -> &'static str {
        match self {
            ResearchEvent::StageStarted { .. } => "stage_started",
            ResearchEvent::QueryGenerated { .. } => "query_generated",
            ResearchEvent::SearchCompleted { .. } => "search_completed",
            ResearchEvent::SearchFailed { .. } => "search_failed",
            ResearchEvent::SummaryUpdated { .. } => "summary_updated",
            ResearchEvent::SummaryFailed { .. } => "summary_failed",
            ResearchEvent::Finished { .. } => "finished",
        }
    }
}
