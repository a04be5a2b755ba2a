//! 研究循环集成测试（Mock LLM + Mock 搜索，无网络）

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use deep_researcher::config::RunConfig;
    use deep_researcher::llm::{LlmError, MockLlmClient};
    use deep_researcher::research::{Researcher, ResearchEvent, SEARCH_FAILURE_SENTINEL};
    use deep_researcher::search::{MockSearch, SearchError, SearchHit};

    fn run_config(max_loops: u32) -> RunConfig {
        RunConfig {
            max_web_research_loops: max_loops,
            ..RunConfig::default()
        }
    }

    fn summary_of_len(n: usize) -> String {
        "Quantum computers exploit superposition and entanglement. "
            .chars()
            .cycle()
            .take(n)
            .collect()
    }

    fn hit(url: &str) -> Vec<SearchHit> {
        vec![SearchHit::new("Result", url, "snippet").with_raw_content("page body")]
    }

    #[tokio::test]
    async fn test_happy_path_three_sources() {
        let summary = summary_of_len(200);
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary.clone()));
        let search = Arc::new(
            MockSearch::new()
                .push_hits(hit("https://a.example/qc"))
                .push_hits(hit("https://b.example/qc"))
                .push_hits(hit("https://c.example/qc")),
        );
        let researcher = Researcher::new(llm, search.clone(), run_config(2));

        let outcome = researcher.run("quantum computing").await;

        assert!(outcome.success);
        assert_eq!(
            outcome.source_urls,
            vec!["https://a.example/qc", "https://b.example/qc", "https://c.example/qc"]
        );
        assert_eq!(outcome.error_reason, None);
        let text = outcome.final_summary.unwrap_or_default();
        assert!(text.starts_with(&format!("## Summary\n{}", summary)));
        assert!(text.contains("\n\n ### Sources:\nhttps://a.example/qc"));
        assert_eq!(search.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_of_len(200)));
        let researcher = Researcher::new(llm, Arc::new(MockSearch::new()), run_config(3));

        let outcome = researcher.run("quantum computing").await;

        assert!(!outcome.success);
        assert!(outcome.source_urls.is_empty());
        assert_eq!(outcome.error_reason.as_deref(), Some("No sources found"));
    }

    #[tokio::test]
    async fn test_short_summary() {
        let llm = Arc::new(MockLlmClient::new().with_default_text("Short"));
        let search = Arc::new(MockSearch::new().push_hits(hit("https://a.example")));
        let researcher = Researcher::new(llm, search, run_config(0));

        let outcome = researcher.run("quantum computing").await;

        assert!(!outcome.success);
        assert_eq!(outcome.source_urls, vec!["https://a.example"]);
        assert_eq!(outcome.error_reason.as_deref(), Some("Failed to generate summary"));
    }

    #[tokio::test]
    async fn test_backend_exception_every_call() {
        let max = 3;
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_of_len(200)));
        let search = Arc::new(MockSearch::failing(SearchError::Request {
            provider: "mock",
            message: "connection reset".into(),
        }));
        let researcher = Researcher::new(llm, search.clone(), run_config(max));

        let run = researcher.execute("quantum computing", None).await;

        assert_eq!(run.state.loop_count(), max + 1);
        assert_eq!(search.queries().len(), (max + 1) as usize);
        assert!(run
            .state
            .gathered_sources()
            .iter()
            .all(|s| s == SEARCH_FAILURE_SENTINEL));
        assert!(run.outcome.source_urls.is_empty());
        assert!(!run.outcome.success);
        // 哨兵行仍保留在诊断文本中（去重后只出现一次）
        let text = run.outcome.final_summary.unwrap_or_default();
        assert_eq!(text.matches(SEARCH_FAILURE_SENTINEL).count(), 1);
    }

    #[tokio::test]
    async fn test_monotonic_progress_with_mixed_failures() {
        let llm = Arc::new(MockLlmClient::new().with_default_text(summary_of_len(120)));
        let search = Arc::new(
            MockSearch::new()
                .push_hits(hit("https://a.example"))
                .push_error(SearchError::Status {
                    provider: "mock",
                    status: 429,
                })
                .push_hits(Vec::new()),
        );
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let researcher = Researcher::new(llm, search, run_config(2));

        let run = researcher.execute("quantum computing", Some(tx)).await;

        let mut counts = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            match ev {
                ResearchEvent::SearchCompleted { loop_count, .. }
                | ResearchEvent::SearchFailed { loop_count, .. } => counts.push(loop_count),
                _ => {}
            }
        }
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(run.state.research_results().len(), 3);
        assert_eq!(run.state.gathered_sources().len(), 3);
        assert!(run.outcome.success);
    }

    #[tokio::test]
    async fn test_fallback_query_is_deterministic() {
        for _ in 0..2 {
            let llm = Arc::new(MockLlmClient::new().with_default_text("<think>x</think>no json"));
            let search = Arc::new(MockSearch::new());
            Researcher::new(llm, search.clone(), run_config(1))
                .run("quantum computing")
                .await;
            for (query, max_results, full_page) in search.queries() {
                assert_eq!(query, "Tell me more about quantum computing");
                assert_eq!(max_results, 3);
                assert!(full_page);
            }
        }
    }

    #[tokio::test]
    async fn test_model_down_still_completes() {
        let llm = Arc::new(
            MockLlmClient::new().with_default_error(LlmError::Request("connection refused".into())),
        );
        let search = Arc::new(MockSearch::new().push_hits(hit("https://a.example")));
        let run = Researcher::new(llm, search, run_config(1))
            .execute("quantum computing", None)
            .await;

        assert_eq!(run.state.loop_count(), 2);
        assert_eq!(run.state.summary(), Some("Summary generation failed"));
        assert_eq!(run.outcome.error_reason.as_deref(), Some("Failed to generate summary"));
        assert_eq!(run.outcome.source_urls, vec!["https://a.example"]);
    }

    #[tokio::test]
    async fn test_tool_calling_mode_uses_follow_up_query() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_tool_call("Query", serde_json::json!({"query": "qubit error correction", "rationale": "r"}))
                .push_text(summary_of_len(80))
                .push_tool_call(
                    "FollowUpQuery",
                    serde_json::json!({"follow_up_query": "surface codes", "knowledge_gap": "g"}),
                )
                .with_default_text(summary_of_len(80)),
        );
        let search = Arc::new(MockSearch::new());
        let cfg = RunConfig {
            use_tool_calling: true,
            ..run_config(1)
        };
        Researcher::new(llm, search.clone(), cfg).run("quantum computing").await;

        let queries: Vec<String> = search.queries().into_iter().map(|q| q.0).collect();
        assert_eq!(queries, vec!["qubit error correction", "surface codes"]);
    }
}
