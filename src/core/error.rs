//! 研究运行的错误类型
//!
//! 只有配置期错误（不支持的搜索后端 / LLM 提供方、配置解析失败）与调用方施加的截止时间会作为 Err 出现；
//! 单步内的 LLM / 搜索失败都在步骤内部降级为状态更新，不会走到这里。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Unsupported search API: {0}")]
    UnsupportedSearchApi(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedLlmProvider(String),

    #[error("Research topic must not be empty")]
    InvalidTopic,

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Research request exceeded {0}-second timeout")]
    Timeout(u64),

    /// 运行器自身失败（如后台任务 panic），由服务边界转成 "Internal error: ..."
    #[error("{0}")]
    Runner(String),
}
