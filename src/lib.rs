//! Deep Researcher - 迭代式网络研究智能体
//!
//! 模块划分：
//! - **api**: HTTP 服务边界（axum 路由、请求/响应模型、SSE 进度流）
//! - **config**: 应用配置加载（默认值 + TOML + 环境变量 + 显式覆盖）
//! - **core**: 错误类型、运行器抽象与调用方截止时间
//! - **llm**: LLM 客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）
//! - **observability**: tracing 日志初始化
//! - **research**: 研究循环状态机、查询抽取、来源聚合与 Finalizer
//! - **search**: 搜索后端（Tavily / Perplexity / DuckDuckGo / SearXNG）与整页抓取

pub mod api;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod research;
pub mod search;

pub use config::{load_config, AppConfig, ConfigOverrides, RunConfig};
pub use research::{ResearchOutcome, Researcher};
