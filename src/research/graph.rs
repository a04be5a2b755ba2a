//! 研究循环状态机
//!
//! GenerateQuery -> WebResearch -> Summarize -> Reflect -> Route -> (WebResearch | Finalize -> Done)
//! 单次运行严格串行；每一步把 LLM / 搜索失败转成降级的状态更新（StepOutcome::Degraded），
//! 从不提前结束运行。唯一的致命错误（不支持的搜索后端）在构造 Researcher 时就已返回。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AppConfig, RunConfig};
use crate::core::{validate_topic, ResearchError, ResearchRunner};
use crate::llm::{create_llm_client, LlmClient, Message};
use crate::research::events::{ResearchEvent, Stage};
use crate::research::extractor::{QueryExtractor, QueryTarget};
use crate::research::finalize::finalize_summary;
use crate::research::prompts;
use crate::research::sources::{deduplicate_and_format_sources, format_source_urls};
use crate::research::state::{ResearchOutcome, ResearchState};
use crate::research::thinking::strip_thinking_tokens;
use crate::search::{create_search_backend, SearchBackend};

/// 搜索失败时写入 gathered_sources 的哨兵条目
pub const SEARCH_FAILURE_SENTINEL: &str = "Error fetching sources";
/// 首次总结即失败时的占位摘要
pub const SUMMARY_FAILURE_PLACEHOLDER: &str = "Summary generation failed";

/// 提取失败时的确定性回退查询
pub fn fallback_query(topic: &str) -> String {
    format!("Tell me more about {}", topic)
}

/// 路由规则：loop_count <= max 时继续搜索，因此共执行 max + 1 轮
pub fn route_research(loop_count: u32, max_loops: u32) -> Stage {
    if loop_count <= max_loops {
        Stage::WebResearch
    } else {
        Stage::Finalize
    }
}

/// 单步结果：正常完成，或已降级写入状态（附带原因，仅用于日志与事件）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Degraded(String),
}

/// 一次运行的终态与最终状态（状态主要供测试与诊断）
#[derive(Debug, Clone)]
pub struct ResearchRun {
    pub state: ResearchState,
    pub outcome: ResearchOutcome,
}

fn emit(events: &Option<UnboundedSender<ResearchEvent>>, ev: ResearchEvent) {
    if let Some(tx) = events {
        let _ = tx.send(ev);
    }
}

/// 研究编排器；不持有任何跨运行的可变状态，可被多个并发请求共享
pub struct Researcher {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchBackend>,
    config: RunConfig,
    extractor: QueryExtractor,
}

impl Researcher {
    pub fn new(llm: Arc<dyn LlmClient>, search: Arc<dyn SearchBackend>, config: RunConfig) -> Self {
        let extractor = QueryExtractor::new(config.use_tool_calling, config.strip_thinking_tokens);
        Self {
            llm,
            search,
            config,
            extractor,
        }
    }

    /// 从应用配置构造：解析搜索后端与 LLM 提供方，未知值立即报错
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self, ResearchError> {
        let run = RunConfig::from_app_config(cfg)?;
        let llm = create_llm_client(&cfg.llm)?;
        let search = create_search_backend(run.search_api, &cfg.search);
        tracing::info!(
            model = llm.model_name(),
            search_api = %run.search_api,
            max_loops = run.max_web_research_loops,
            tool_calling = run.use_tool_calling,
            "researcher configured"
        );
        Ok(Self::new(llm, search, run))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, topic: &str) -> ResearchOutcome {
        self.execute(topic, None).await.outcome
    }

    pub async fn run_with_events(
        &self,
        topic: &str,
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> ResearchOutcome {
        self.execute(topic, events).await.outcome
    }

    /// 驱动状态机直到 Done，返回结果与最终状态
    pub async fn execute(
        &self,
        topic: &str,
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> ResearchRun {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("research", %run_id, topic = %topic);
        async move {
            tracing::info!(search = self.search.name(), "research started");
            let mut state = ResearchState::new(topic);
            let mut outcome = None;
            let mut stage = Stage::GenerateQuery;

            while stage != Stage::Done {
                emit(
                    &events,
                    ResearchEvent::StageStarted {
                        stage,
                        loop_count: state.loop_count(),
                    },
                );
                stage = match stage {
                    Stage::GenerateQuery => {
                        self.generate_query(&mut state, &events).await;
                        Stage::WebResearch
                    }
                    Stage::WebResearch => {
                        if let StepOutcome::Degraded(reason) = self.web_research(&mut state, &events).await {
                            tracing::warn!(loop_count = state.loop_count(), %reason, "web research degraded");
                        }
                        Stage::Summarize
                    }
                    Stage::Summarize => {
                        if let StepOutcome::Degraded(reason) =
                            self.summarize_sources(&mut state, &events).await
                        {
                            tracing::warn!(%reason, "summarization degraded");
                        }
                        Stage::Reflect
                    }
                    Stage::Reflect => {
                        self.reflect_on_summary(&mut state, &events).await;
                        Stage::Route
                    }
                    Stage::Route => {
                        let next =
                            route_research(state.loop_count(), self.config.max_web_research_loops);
                        tracing::debug!(loop_count = state.loop_count(), next = next.as_str(), "route");
                        next
                    }
                    Stage::Finalize => {
                        outcome = Some(finalize_summary(state.summary(), state.gathered_sources()));
                        Stage::Done
                    }
                    Stage::Done => Stage::Done,
                };
            }

            let outcome = outcome
                .unwrap_or_else(|| finalize_summary(state.summary(), state.gathered_sources()));
            tracing::info!(
                success = outcome.success,
                source_count = outcome.source_urls.len(),
                loops = state.loop_count(),
                error = outcome.error_reason.as_deref().unwrap_or(""),
                "research finished"
            );
            emit(
                &events,
                ResearchEvent::Finished {
                    success: outcome.success,
                    source_count: outcome.source_urls.len(),
                },
            );
            ResearchRun { state, outcome }
        }
        .instrument(span)
        .await
    }

    fn query_system_prompt(&self, base: String, tool_suffix: &str, json_suffix: &str) -> String {
        let suffix = if self.extractor.uses_tools() {
            tool_suffix
        } else {
            json_suffix
        };
        format!("{}{}", base, suffix)
    }

    /// 由主题生成首个查询
    async fn generate_query(
        &self,
        state: &mut ResearchState,
        events: &Option<UnboundedSender<ResearchEvent>>,
    ) {
        let system = self.query_system_prompt(
            prompts::query_writer_instructions(&prompts::current_date(), state.topic()),
            prompts::TOOL_CALLING_QUERY_INSTRUCTIONS,
            prompts::JSON_MODE_QUERY_INSTRUCTIONS,
        );
        let messages = [Message::system(system), Message::user(prompts::QUERY_REQUEST)];
        let query = self
            .extractor
            .extract(
                self.llm.as_ref(),
                &messages,
                &QueryTarget::search_query(),
                &fallback_query(state.topic()),
            )
            .await;
        tracing::info!(query = %query, "initial query");
        emit(
            events,
            ResearchEvent::QueryGenerated {
                query: query.clone(),
                loop_count: state.loop_count(),
            },
        );
        state.set_query(query);
    }

    /// 执行当前查询；无论成败都追加一对条目并计一轮
    async fn web_research(
        &self,
        state: &mut ResearchState,
        events: &Option<UnboundedSender<ResearchEvent>>,
    ) -> StepOutcome {
        let query = state
            .current_query()
            .map(String::from)
            .unwrap_or_else(|| fallback_query(state.topic()));
        let api = self.config.search_api;
        let fetch_full_page = self.config.fetch_full_page;

        match self
            .search
            .search(&query, api.max_results(), fetch_full_page)
            .await
        {
            Ok(hits) => {
                let formatted = deduplicate_and_format_sources(
                    &hits,
                    self.config.max_tokens_per_source,
                    fetch_full_page,
                );
                state.record_iteration(formatted, format_source_urls(&hits));
                tracing::debug!(hits = hits.len(), loop_count = state.loop_count(), "search completed");
                emit(
                    events,
                    ResearchEvent::SearchCompleted {
                        query,
                        hits: hits.len(),
                        loop_count: state.loop_count(),
                    },
                );
                StepOutcome::Completed
            }
            Err(e) => {
                state.record_iteration(
                    format!("Search failed: {}", e),
                    SEARCH_FAILURE_SENTINEL.to_string(),
                );
                emit(
                    events,
                    ResearchEvent::SearchFailed {
                        query,
                        error: e.to_string(),
                        loop_count: state.loop_count(),
                    },
                );
                StepOutcome::Degraded(e.to_string())
            }
        }
    }

    /// 用最新一轮结果创建或更新摘要
    async fn summarize_sources(
        &self,
        state: &mut ResearchState,
        events: &Option<UnboundedSender<ResearchEvent>>,
    ) -> StepOutcome {
        let request = prompts::summarize_request(
            state.topic(),
            state.latest_research_result().unwrap_or_default(),
            state.summary(),
        );
        let messages = [
            Message::system(prompts::SUMMARIZER_INSTRUCTIONS),
            Message::user(request),
        ];
        match self.llm.complete(&messages).await {
            Ok(text) => {
                let summary = if self.config.strip_thinking_tokens {
                    strip_thinking_tokens(&text)
                } else {
                    text
                };
                emit(
                    events,
                    ResearchEvent::SummaryUpdated {
                        chars: summary.chars().count(),
                    },
                );
                state.set_summary(summary);
                StepOutcome::Completed
            }
            Err(e) => {
                if state.summary().map_or(true, str::is_empty) {
                    state.set_summary(SUMMARY_FAILURE_PLACEHOLDER);
                }
                emit(
                    events,
                    ResearchEvent::SummaryFailed {
                        error: e.to_string(),
                    },
                );
                StepOutcome::Degraded(e.to_string())
            }
        }
    }

    /// 反思知识缺口，产出下一轮查询
    async fn reflect_on_summary(
        &self,
        state: &mut ResearchState,
        events: &Option<UnboundedSender<ResearchEvent>>,
    ) {
        let system = self.query_system_prompt(
            prompts::reflection_instructions(state.topic()),
            prompts::TOOL_CALLING_REFLECTION_INSTRUCTIONS,
            prompts::JSON_MODE_REFLECTION_INSTRUCTIONS,
        );
        let messages = [
            Message::system(system),
            Message::user(prompts::reflection_request(state.summary())),
        ];
        let query = self
            .extractor
            .extract(
                self.llm.as_ref(),
                &messages,
                &QueryTarget::follow_up_query(),
                &fallback_query(state.topic()),
            )
            .await;
        tracing::info!(query = %query, loop_count = state.loop_count(), "follow-up query");
        emit(
            events,
            ResearchEvent::QueryGenerated {
                query: query.clone(),
                loop_count: state.loop_count(),
            },
        );
        state.set_query(query);
    }
}

#[async_trait]
impl ResearchRunner for Researcher {
    async fn research(
        &self,
        topic: &str,
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> Result<ResearchOutcome, ResearchError> {
        let topic = validate_topic(topic)?;
        Ok(self.run_with_events(topic, events).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CallKind, LlmError, MockLlmClient};
    use crate::search::{MockSearch, SearchError, SearchHit};

    fn config(max: u32) -> RunConfig {
        RunConfig {
            max_web_research_loops: max,
            fetch_full_page: false,
            ..RunConfig::default()
        }
    }

    fn summary_text() -> String {
        "Rust guarantees memory safety without a garbage collector. ".repeat(3)
    }

    #[test]
    fn test_route_is_inclusive_of_max() {
        assert_eq!(route_research(0, 0), Stage::WebResearch);
        assert_eq!(route_research(1, 0), Stage::Finalize);
        assert_eq!(route_research(3, 3), Stage::WebResearch);
        assert_eq!(route_research(4, 3), Stage::Finalize);
    }

    #[test]
    fn test_fallback_query_format() {
        assert_eq!(fallback_query("quantum computing"), "Tell me more about quantum computing");
    }

    #[tokio::test]
    async fn test_runs_max_plus_one_iterations() {
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_text()));
        let search = Arc::new(MockSearch::new());
        let researcher = Researcher::new(llm, search.clone(), config(2));

        let run = researcher.execute("rust", None).await;
        assert_eq!(run.state.loop_count(), 3);
        assert_eq!(search.queries().len(), 3);
        assert_eq!(run.state.research_results().len(), 3);
        assert_eq!(run.state.gathered_sources().len(), 3);
    }

    #[tokio::test]
    async fn test_queries_flow_from_extractor_to_backend() {
        // 生成查询 -> 总结 -> 反思 -> 总结 -> 反思
        let llm = Arc::new(
            MockLlmClient::new()
                .push_text(r#"{"query": "rust ownership", "rationale": "basics"}"#)
                .push_text(summary_text())
                .push_text(r#"{"follow_up_query": "rust lifetimes", "knowledge_gap": "x"}"#)
                .push_text(summary_text())
                .push_text("not json"),
        );
        let search = Arc::new(MockSearch::new());
        let researcher = Researcher::new(llm.clone(), search.clone(), config(1));

        researcher.run("rust").await;
        let queries: Vec<String> = search.queries().into_iter().map(|q| q.0).collect();
        assert_eq!(queries, vec!["rust ownership", "rust lifetimes"]);

        let kinds: Vec<CallKind> = llm.calls().into_iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CallKind::Json, CallKind::Text, CallKind::Json, CallKind::Text, CallKind::Json]
        );
    }

    #[tokio::test]
    async fn test_backend_result_count_follows_selection() {
        let llm = Arc::new(MockLlmClient::new());
        let search = Arc::new(MockSearch::new());
        let cfg = RunConfig {
            search_api: crate::search::SearchApi::Tavily,
            ..config(0)
        };
        Researcher::new(llm, search.clone(), cfg).run("rust").await;
        assert_eq!(search.queries()[0].1, 1);
    }

    #[tokio::test]
    async fn test_search_failure_records_sentinel() {
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_text()));
        let search = Arc::new(MockSearch::failing(SearchError::Status {
            provider: "mock",
            status: 503,
        }));
        let run = Researcher::new(llm, search, config(0)).execute("rust", None).await;

        assert_eq!(run.state.gathered_sources(), [SEARCH_FAILURE_SENTINEL]);
        assert!(run.state.research_results()[0].starts_with("Search failed: "));
        assert!(!run.outcome.success);
        assert_eq!(run.outcome.error_reason.as_deref(), Some("No sources found"));
    }

    #[tokio::test]
    async fn test_first_summary_failure_sets_placeholder() {
        let llm = Arc::new(
            MockLlmClient::new().with_default_error(LlmError::Request("connection refused".into())),
        );
        let search = Arc::new(
            MockSearch::new().push_hits(vec![SearchHit::new("a", "https://a.example", "snippet")]),
        );
        let run = Researcher::new(llm, search, config(0)).execute("rust", None).await;
        assert_eq!(run.state.summary(), Some(SUMMARY_FAILURE_PLACEHOLDER));
        assert_eq!(run.outcome.error_reason.as_deref(), Some("Failed to generate summary"));
    }

    #[tokio::test]
    async fn test_later_summary_failure_keeps_existing() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_text("{}")
                .push_text(summary_text())
                .push_text("{}")
                .push_error(LlmError::Status {
                    status: 500,
                    body: "boom".into(),
                })
                .push_text("{}"),
        );
        let search = Arc::new(MockSearch::new());
        let run = Researcher::new(llm, search, config(1)).execute("rust", None).await;
        assert_eq!(run.state.summary(), Some(summary_text().as_str()));
    }

    #[tokio::test]
    async fn test_summary_thinking_tokens_stripped() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_text("{}")
                .push_text("<think>plan</think>Final summary"),
        );
        let run = Researcher::new(llm, Arc::new(MockSearch::new()), config(0))
            .execute("rust", None)
            .await;
        assert_eq!(run.state.summary(), Some("Final summary"));
    }

    #[tokio::test]
    async fn test_events_cover_every_stage() {
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_text()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        Researcher::new(llm, Arc::new(MockSearch::new()), config(0))
            .run_with_events("rust", Some(tx))
            .await;

        let mut stages = Vec::new();
        let mut finished = false;
        while let Ok(ev) = rx.try_recv() {
            match ev {
                ResearchEvent::StageStarted { stage, .. } => stages.push(stage),
                ResearchEvent::Finished { .. } => finished = true,
                _ => {}
            }
        }
        assert_eq!(
            stages,
            vec![
                Stage::GenerateQuery,
                Stage::WebResearch,
                Stage::Summarize,
                Stage::Reflect,
                Stage::Route,
                Stage::Finalize
            ]
        );
        assert!(finished);
    }

    #[tokio::test]
    async fn test_runner_rejects_blank_topic() {
        let researcher = Researcher::new(
            Arc::new(MockLlmClient::new()),
            Arc::new(MockSearch::new()),
            config(0),
        );
        assert!(matches!(
            researcher.research("   ", None).await,
            Err(ResearchError::InvalidTopic)
        ));
    }
}
