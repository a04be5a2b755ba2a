//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按调用顺序弹出预置回复；队列耗尽后返回默认回复。每次调用都会记录调用方式与消息，便于断言。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{LlmClient, LlmError, LlmReply, Message, ToolDefinition};

/// 调用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Text,
    Json,
    Tools,
}

/// 一次调用记录
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Mock 客户端：预置回复队列 + 默认回复
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<LlmReply, LlmError>>>,
    default_reply: Result<LlmReply, LlmError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    /// 默认回复为空 JSON 对象
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_reply: Ok(LlmReply::text("{}")),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 队列耗尽后的回复
    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Ok(LlmReply::text(text));
        self
    }

    /// 队列耗尽后一律失败
    pub fn with_default_error(mut self, err: LlmError) -> Self {
        self.default_reply = Err(err);
        self
    }

    pub fn push_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(LlmReply::text(text)))
    }

    pub fn push_tool_call(self, name: impl Into<String>, arguments: Value) -> Self {
        self.push(Ok(LlmReply::tool_call(name, arguments)))
    }

    pub fn push_error(self, err: LlmError) -> Self {
        self.push(Err(err))
    }

    pub fn push(self, reply: Result<LlmReply, LlmError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    /// 已发生的调用（按顺序）
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_reply(&self, kind: CallKind, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmReply, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                kind,
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.next_reply(CallKind::Text, messages, &[]).map(|r| r.content)
    }

    async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.next_reply(CallKind::Json, messages, &[]).map(|r| r.content)
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        self.next_reply(CallKind::Tools, messages, tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default() {
        let mock = MockLlmClient::new()
            .with_default_text("fallback")
            .push_text("first")
            .push_error(LlmError::EmptyResponse);
        let msgs = [Message::user("q")];
        assert_eq!(mock.complete(&msgs).await.unwrap(), "first");
        assert_eq!(mock.complete_json(&msgs).await, Err(LlmError::EmptyResponse));
        assert_eq!(mock.complete(&msgs).await.unwrap(), "fallback");

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].kind, CallKind::Json);
    }
}
