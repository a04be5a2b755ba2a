//! LLM 层：客户端抽象与实现（Ollama / OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use message::{Message, Role};
pub use mock::{CallKind, MockLlmClient, RecordedCall};
pub use ollama::{OllamaClient, DEFAULT_OLLAMA_BASE_URL};
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmError, LlmReply, ToolCall, ToolDefinition};

use crate::config::LlmSection;
use crate::core::ResearchError;

/// 按 [llm].provider 创建客户端：ollama（默认）/ openai
pub fn create_llm_client(cfg: &LlmSection) -> Result<Arc<dyn LlmClient>, ResearchError> {
    match cfg.provider.trim().to_lowercase().as_str() {
        "ollama" => Ok(Arc::new(OllamaClient::new(
            &cfg.base_url,
            &cfg.model,
            cfg.request_timeout_secs,
        ))),
        "openai" => Ok(Arc::new(OpenAiClient::new(
            Some(cfg.base_url.as_str()),
            &cfg.model,
            cfg.api_key.as_deref(),
        ))),
        other => Err(ResearchError::UnsupportedLlmProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_llm_client_by_provider() {
        let mut cfg = LlmSection::default();
        let client = create_llm_client(&cfg).unwrap();
        assert_eq!(client.model_name(), "llama3.2");

        cfg.provider = "openai".to_string();
        cfg.model = "gpt-4o-mini".to_string();
        let client = create_llm_client(&cfg).unwrap();
        assert_eq!(client.model_name(), "gpt-4o-mini");

        cfg.provider = "lmstudio".to_string();
        assert!(matches!(
            create_llm_client(&cfg),
            Err(ResearchError::UnsupportedLlmProvider(p)) if p == "lmstudio"
        ));
    }
}
