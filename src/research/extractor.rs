//! 结构化查询抽取：从一次 LLM 回复中得到一个搜索查询
//!
//! 两种模式由配置选择，契约相同：单次调用、不重试、任何失败都返回 fallback。
//! - ToolCall：绑定工具（Query / FollowUpQuery），读取第一条调用中的字段
//! - Json：JSON 约束输出，解析后读取字段；解析失败时只做推理痕迹清理并记日志，仍返回 fallback

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::llm::{LlmClient, Message, ToolDefinition};
use crate::research::thinking::strip_thinking_tokens;

/// 生成网页搜索查询的工具参数
#[allow(dead_code)]
#[derive(JsonSchema)]
struct Query {
    /// The actual search query string
    query: String,
    /// Brief explanation of why this query is relevant
    rationale: String,
}

/// 针对知识缺口的追问工具参数
#[allow(dead_code)]
#[derive(JsonSchema)]
struct FollowUpQuery {
    /// Write a specific question to address this gap
    follow_up_query: String,
    /// Describe what information is missing or needs clarification
    knowledge_gap: String,
}

/// 抽取目标：工具定义 + 要读取的字段名
#[derive(Debug, Clone)]
pub struct QueryTarget {
    pub tool: ToolDefinition,
    pub field: &'static str,
}

impl QueryTarget {
    /// 初始查询（字段 `query`）
    pub fn search_query() -> Self {
        Self {
            tool: ToolDefinition {
                name: "Query".to_string(),
                description: "This tool is used to generate a query for web search.".to_string(),
                parameters: schema_value::<Query>(),
            },
            field: "query",
        }
    }

    /// 反思后的追问（字段 `follow_up_query`）
    pub fn follow_up_query() -> Self {
        Self {
            tool: ToolDefinition {
                name: "FollowUpQuery".to_string(),
                description:
                    "This tool is used to generate a follow-up query to address a knowledge gap."
                        .to_string(),
                parameters: schema_value::<FollowUpQuery>(),
            },
            field: "follow_up_query",
        }
    }
}

fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 从 JSON 对象读取非空字符串字段
fn non_empty_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// 抽取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryExtractor {
    ToolCall,
    Json { strip_thinking_tokens: bool },
}

impl QueryExtractor {
    pub fn new(use_tool_calling: bool, strip_thinking_tokens: bool) -> Self {
        if use_tool_calling {
            QueryExtractor::ToolCall
        } else {
            QueryExtractor::Json {
                strip_thinking_tokens,
            }
        }
    }

    /// 追加到 system prompt 的输出格式说明是否按工具模式
    pub fn uses_tools(&self) -> bool {
        matches!(self, QueryExtractor::ToolCall)
    }

    /// 返回恰好一个查询；永不失败
    pub async fn extract(
        &self,
        llm: &dyn LlmClient,
        messages: &[Message],
        target: &QueryTarget,
        fallback: &str,
    ) -> String {
        match self {
            QueryExtractor::ToolCall => {
                let reply = match llm
                    .complete_with_tools(messages, std::slice::from_ref(&target.tool))
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, tool = %target.tool.name, "tool call failed, using fallback query");
                        return fallback.to_string();
                    }
                };
                let Some(call) = reply.tool_calls.first() else {
                    tracing::debug!(tool = %target.tool.name, "model issued no tool call, using fallback query");
                    return fallback.to_string();
                };
                non_empty_field(&call.arguments, target.field).unwrap_or_else(|| {
                    tracing::debug!(field = target.field, "tool call missing field, using fallback query");
                    fallback.to_string()
                })
            }
            QueryExtractor::Json {
                strip_thinking_tokens: strip,
            } => {
                let content = match llm.complete_json(messages).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(error = %e, "json completion failed, using fallback query");
                        return fallback.to_string();
                    }
                };
                let parsed = serde_json::from_str::<Value>(&content)
                    .ok()
                    .and_then(|v| non_empty_field(&v, target.field));
                if let Some(query) = parsed {
                    return query;
                }
                let cleaned = if *strip {
                    strip_thinking_tokens(&content)
                } else {
                    content
                };
                tracing::debug!(
                    field = target.field,
                    raw_chars = cleaned.chars().count(),
                    "unparseable structured output, using fallback query"
                );
                fallback.to_string()
            }
        }
    }
}
