//! LLM 客户端抽象
//!
//! 所有后端（Ollama / OpenAI 兼容 / Mock）实现 LlmClient：
//! complete（自由文本）、complete_json（JSON 约束输出）、complete_with_tools（结构化工具调用）。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用失败的原因；调用方一律降级处理，不向外传播
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode LLM response: {0}")]
    Decode(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// 提供给模型的工具定义（parameters 为 JSON Schema）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 模型发起的一次结构化调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// 带工具调用的回复：文本 + 零个或多个调用
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: name.into(),
                arguments,
            }],
        }
    }
}

/// LLM 客户端 trait：单次调用，不做内部重试
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 模型名（日志用）
    fn model_name(&self) -> &str;

    /// 自由文本完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// JSON 约束输出；不支持的后端退回普通完成，由调用方自行解析
    async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.complete(messages).await
    }

    /// 绑定工具后完成；默认实现不支持工具，返回的回复不含调用
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        let _ = tools;
        let content = self.complete(messages).await?;
        Ok(LlmReply::text(content))
    }
}
