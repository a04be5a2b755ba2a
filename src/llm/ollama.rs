//! Ollama 原生 API 客户端（POST {base_url}/api/chat）
//!
//! - 非流式调用，temperature 固定为 0
//! - JSON 模式：请求体带 `"format": "json"`
//! - 工具模式：请求体带 `tools`，回复中的 `message.tool_calls` 转为 ToolCall

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{LlmClient, LlmError, LlmReply, Message, ToolCall, ToolDefinition};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/";

/// Ollama 客户端：持有 HTTP Client、base_url 与模型名
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn request_body(&self, messages: &[Message], json_mode: bool, tools: &[ToolDefinition]) -> Value {
        let wire_messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        let mut body = json!({
            "model": self.model,
            "messages": wire_messages,
            "stream": false,
            "options": { "temperature": 0 },
        });
        if json_mode {
            body["format"] = Value::String("json".to_string());
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|t| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": t.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        body
    }

    async fn chat(&self, body: Value) -> Result<ChatMessage, LlmError> {
        let resp = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;
        parsed.message.ok_or(LlmError::EmptyResponse)
    }
}

/// Ollama 的 arguments 通常是对象；部分模型返回 JSON 字符串，这里统一解成 Value
fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let message = self.chat(self.request_body(messages, false, &[])).await?;
        Ok(message.content)
    }

    async fn complete_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        let message = self.chat(self.request_body(messages, true, &[])).await?;
        Ok(message.content)
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, LlmError> {
        let message = self.chat(self.request_body(messages, false, tools)).await?;
        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|c| ToolCall {
                name: c.function.name,
                arguments: normalize_arguments(c.function.arguments),
            })
            .collect();
        Ok(LlmReply {
            content: message.content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_json_mode() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2", 5);
        let body = client.request_body(&[Message::user("hi")], true, &[]);
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0);
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_request_body_with_tools() {
        let client = OllamaClient::new("http://localhost:11434", "llama3.2", 5);
        let tool = ToolDefinition {
            name: "Query".to_string(),
            description: "web search query".to_string(),
            parameters: json!({"type": "object"}),
        };
        let body = client.request_body(&[Message::system("s")], false, &[tool]);
        assert!(body.get("format").is_none());
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "Query");
    }

    #[test]
    fn test_chat_url_trims_trailing_slash() {
        let client = OllamaClient::new("http://ollama:11434/", "m", 5);
        assert_eq!(client.chat_url(), "http://ollama:11434/api/chat");
    }

    #[test]
    fn test_normalize_arguments_parses_string() {
        let args = normalize_arguments(Value::String(r#"{"query":"rust"}"#.to_string()));
        assert_eq!(args["query"], "rust");
        let args = normalize_arguments(json!({"query": "x"}));
        assert_eq!(args["query"], "x");
    }

    #[test]
    fn test_decode_tool_call_response() {
        let raw = r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"Query","arguments":{"query":"rust async"}}}]}}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = parsed.message.unwrap();
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function.name, "Query");
        assert_eq!(message.tool_calls[0].function.arguments["query"], "rust async");
    }
}
