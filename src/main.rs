//! Deep Researcher CLI
//!
//! 对命令行给出的主题运行一次研究循环，打印最终摘要与来源。
//! 命令行参数是配置的最高优先级层（高于环境变量与配置文件）。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use deep_researcher::{
    config::{load_config, ConfigOverrides},
    core::run_with_deadline,
    observability,
    research::{ResearchEvent, Researcher},
};

#[derive(Parser, Debug)]
#[command(name = "deep-researcher", version, about = "Iterative web research on a topic")]
struct Cli {
    /// 研究主题
    topic: String,

    /// 配置文件路径（默认查找 config/default.toml）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 最大搜索轮数（实际执行 max + 1 轮）
    #[arg(long)]
    max_loops: Option<u32>,

    /// 搜索后端：tavily / perplexity / duckduckgo / searxng
    #[arg(short, long)]
    search_api: Option<String>,

    #[arg(long)]
    fetch_full_page: Option<bool>,

    #[arg(long)]
    strip_thinking_tokens: Option<bool>,

    /// 用工具调用而非 JSON 文本抽取查询
    #[arg(long)]
    use_tool_calling: Option<bool>,

    /// LLM 提供方：ollama / openai
    #[arg(long)]
    provider: Option<String>,

    #[arg(short, long)]
    model: Option<String>,

    #[arg(long)]
    base_url: Option<String>,

    /// 整次研究的超时秒数（默认取 server.request_timeout_secs）
    #[arg(short, long)]
    timeout: Option<u64>,

    /// 在 stderr 打印进度事件
    #[arg(short, long)]
    progress: bool,

    /// 以 JSON 输出结果
    #[arg(long)]
    json: bool,

    /// JSON 格式日志
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            max_web_research_loops: self.max_loops,
            search_api: self.search_api.clone(),
            fetch_full_page: self.fetch_full_page,
            strip_thinking_tokens: self.strip_thinking_tokens,
            use_tool_calling: self.use_tool_calling,
            llm_provider: self.provider.clone(),
            llm_model: self.model.clone(),
            llm_base_url: self.base_url.clone(),
        }
    }
}

fn describe(ev: &ResearchEvent) -> String {
    match ev {
        ResearchEvent::StageStarted { stage, loop_count } => {
            format!("[{}] {}", loop_count, stage.as_str())
        }
        ResearchEvent::QueryGenerated { query, .. } => format!("  query: {}", query),
        ResearchEvent::SearchCompleted { hits, .. } => format!("  {} result(s)", hits),
        ResearchEvent::SearchFailed { error, .. } => format!("  search failed: {}", error),
        ResearchEvent::SummaryUpdated { chars } => format!("  summary: {} chars", chars),
        ResearchEvent::SummaryFailed { error } => format!("  summary failed: {}", error),
        ResearchEvent::Finished {
            success,
            source_count,
        } => format!("done (success={}, sources={})", success, source_count),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(cli.json_logs);

    let cfg = load_config(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load config")?;
    let researcher = Researcher::from_app_config(&cfg).context("Failed to configure researcher")?;
    let deadline = Duration::from_secs(cli.timeout.unwrap_or(cfg.server.request_timeout_secs));

    let (events, printer) = if cli.progress {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ResearchEvent>();
        let handle = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                eprintln!("{}", describe(&ev));
            }
        });
        (Some(tx), Some(handle))
    } else {
        (None, None)
    };

    let result = run_with_deadline(&researcher, &cli.topic, deadline, events).await;
    if let Some(handle) = printer {
        let _ = handle.await;
    }
    let outcome = result.context("Research failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if let Some(summary) = &outcome.final_summary {
        println!("{}", summary);
    }

    match outcome.error_reason {
        Some(reason) if !outcome.success => anyhow::bail!(reason),
        _ => Ok(()),
    }
}
