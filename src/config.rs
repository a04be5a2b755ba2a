//! 应用配置：默认值 → config/default.toml → 环境变量 → 显式覆盖
//!
//! 环境变量两种写法：
//! - 嵌套：`RESEARCHER__<段>__<键>`，如 `RESEARCHER__SERVER__PORT=9000`
//! - 扁平：`MAX_WEB_RESEARCH_LOOPS`、`SEARCH_API`、`LLM_MODEL`、`OLLAMA_BASE_URL` 等，映射到对应段
//!
//! 显式覆盖（CLI 参数 / 调用方传入）优先级最高。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::ResearchError;
use crate::search::SearchApi;

/// 嵌套环境变量前缀
pub const ENV_PREFIX: &str = "RESEARCHER__";

/// 扁平环境变量 → 嵌套键（后出现的同目标键优先）
const FLAT_ENV_KEYS: &[(&str, &str)] = &[
    ("MAX_WEB_RESEARCH_LOOPS", "RESEARCH__MAX_WEB_RESEARCH_LOOPS"),
    ("SEARCH_API", "RESEARCH__SEARCH_API"),
    ("FETCH_FULL_PAGE", "RESEARCH__FETCH_FULL_PAGE"),
    ("STRIP_THINKING_TOKENS", "RESEARCH__STRIP_THINKING_TOKENS"),
    ("USE_TOOL_CALLING", "RESEARCH__USE_TOOL_CALLING"),
    ("LLM_PROVIDER", "LLM__PROVIDER"),
    ("LOCAL_LLM", "LLM__MODEL"),
    ("LLM_MODEL", "LLM__MODEL"),
    ("OLLAMA_BASE_URL", "LLM__BASE_URL"),
    ("OPENAI_API_KEY", "LLM__API_KEY"),
    ("TAVILY_API_KEY", "SEARCH__TAVILY_API_KEY"),
    ("PERPLEXITY_API_KEY", "SEARCH__PERPLEXITY_API_KEY"),
    ("SEARXNG_URL", "SEARCH__SEARXNG_URL"),
];

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub research: ResearchSection,
    pub llm: LlmSection,
    pub search: SearchSection,
    pub server: ServerSection,
}

/// [research] 段：循环深度、搜索后端、输出处理方式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResearchSection {
    pub max_web_research_loops: u32,
    /// tavily / perplexity / duckduckgo / searxng；运行开始时解析，未知值为致命错误
    pub search_api: String,
    pub fetch_full_page: bool,
    /// 去掉 `<think>...</think>` 推理痕迹
    pub strip_thinking_tokens: bool,
    /// true: 工具调用抽取查询；false: JSON 文本解析
    pub use_tool_calling: bool,
    /// 每个来源送入模型的 token 上限（按 4 字符/token 折算）
    pub max_tokens_per_source: usize,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            max_web_research_loops: 3,
            search_api: "duckduckgo".to_string(),
            fetch_full_page: true,
            strip_thinking_tokens: true,
            use_tool_calling: false,
            max_tokens_per_source: 1000,
        }
    }
}

/// [llm] 段：提供方、模型、地址、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// ollama / openai
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            base_url: "http://localhost:11434/".to_string(),
            api_key: None,
            request_timeout_secs: 120,
        }
    }
}

/// [search] 段：HTTP 超时与各后端凭据 / 地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub timeout_secs: u64,
    pub tavily_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub searxng_url: String,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            tavily_api_key: None,
            perplexity_api_key: None,
            searxng_url: "http://localhost:8888".to_string(),
        }
    }
}

/// [server] 段：监听地址、整次研究的超时、日志格式
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub json_logs: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 300,
            json_logs: false,
        }
    }
}

/// 显式覆盖：优先级高于文件与环境变量，None 表示不覆盖
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_web_research_loops: Option<u32>,
    pub search_api: Option<String>,
    pub fetch_full_page: Option<bool>,
    pub strip_thinking_tokens: Option<bool>,
    pub use_tool_calling: Option<bool>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
}

impl ConfigOverrides {
    fn apply(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        builder
            .set_override_option(
                "research.max_web_research_loops",
                self.max_web_research_loops.map(i64::from),
            )?
            .set_override_option("research.search_api", self.search_api.clone())?
            .set_override_option("research.fetch_full_page", self.fetch_full_page)?
            .set_override_option("research.strip_thinking_tokens", self.strip_thinking_tokens)?
            .set_override_option("research.use_tool_calling", self.use_tool_calling)?
            .set_override_option("llm.provider", self.llm_provider.clone())?
            .set_override_option("llm.model", self.llm_model.clone())?
            .set_override_option("llm.base_url", self.llm_base_url.clone())
    }
}

/// 单次运行的不可变配置（由 AppConfig 投影而来）
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub max_web_research_loops: u32,
    pub search_api: SearchApi,
    pub fetch_full_page: bool,
    pub strip_thinking_tokens: bool,
    pub use_tool_calling: bool,
    pub max_tokens_per_source: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_web_research_loops: 3,
            search_api: SearchApi::DuckDuckGo,
            fetch_full_page: true,
            strip_thinking_tokens: true,
            use_tool_calling: false,
            max_tokens_per_source: 1000,
        }
    }
}

impl RunConfig {
    /// 解析 search_api；未知后端在任何迭代开始前即失败
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self, ResearchError> {
        let search_api: SearchApi = cfg.research.search_api.parse()?;
        Ok(Self {
            max_web_research_loops: cfg.research.max_web_research_loops,
            search_api,
            fetch_full_page: cfg.research.fetch_full_page,
            strip_thinking_tokens: cfg.research.strip_thinking_tokens,
            use_tool_calling: cfg.research.use_tool_calling,
            max_tokens_per_source: cfg.research.max_tokens_per_source,
        })
    }
}

/// 把进程环境整理成 config::Environment 能识别的嵌套键（仅保留已知变量）
fn env_overlay(env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut overlay = HashMap::new();
    for (flat, nested) in FLAT_ENV_KEYS {
        if let Some(value) = env.get(*flat) {
            overlay.insert((*nested).to_string(), value.clone());
        }
    }
    for (key, value) in env {
        if let Some(nested) = key.strip_prefix(ENV_PREFIX) {
            if !nested.is_empty() {
                overlay.insert(nested.to_string(), value.clone());
            }
        }
    }
    overlay
}

/// 从 config 目录、进程环境与显式覆盖加载配置
pub fn load_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<AppConfig, config::ConfigError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_config_with_env(config_path, &env, overrides)
}

/// 同 load_config，但环境变量由调用方提供（测试不必改动进程环境）
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在）
/// 3. 叠加环境变量
/// 4. 叠加显式覆盖
pub fn load_config_with_env(
    config_path: Option<&Path>,
    env: &HashMap<String, String>,
    overrides: &ConfigOverrides,
) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = PathBuf::from(format!("{}.toml", name));
        if path.exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::default()
            .separator("__")
            .try_parsing(true)
            .source(Some(env_overlay(env))),
    );

    builder = overrides.apply(builder)?;

    builder.build()?.try_deserialize()
}
