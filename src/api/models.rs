//! HTTP 请求 / 响应模型

use serde::{Deserialize, Serialize};

use crate::core::ResearchError;
use crate::research::ResearchOutcome;

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub success: bool,
    pub summary: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub error_message: Option<String>,
}

impl From<ResearchOutcome> for ResearchResponse {
    fn from(outcome: ResearchOutcome) -> Self {
        Self {
            success: outcome.success,
            summary: outcome.final_summary,
            sources: outcome.source_urls,
            error_message: outcome.error_reason,
        }
    }
}

impl ResearchResponse {
    /// 服务边界自己合成的失败响应（无摘要、无来源）
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: None,
            sources: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    /// 把一次运行的结果映射为响应：超时与内部错误都转成 success=false，不向传输层抛错
    pub fn from_result(result: Result<ResearchOutcome, ResearchError>) -> Self {
        match result {
            Ok(outcome) => outcome.into(),
            Err(e @ ResearchError::Timeout(_)) => Self::failure(e.to_string()),
            Err(e) => Self::failure(format!("Internal error: {}", e)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// 422 等客户端错误的响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_maps_field_by_field() {
        let outcome = ResearchOutcome {
            success: true,
            final_summary: Some("## Summary\nok".into()),
            source_urls: vec!["https://a.example".into()],
            error_reason: None,
        };
        let resp = ResearchResponse::from_result(Ok(outcome));
        assert!(resp.success);
        assert_eq!(resp.summary.as_deref(), Some("## Summary\nok"));
        assert_eq!(resp.sources, vec!["https://a.example"]);
        assert!(resp.error_message.is_none());
    }

    #[test]
    fn test_timeout_message() {
        let resp = ResearchResponse::from_result(Err(ResearchError::Timeout(300)));
        assert!(!resp.success);
        assert!(resp.summary.is_none());
        assert!(resp.sources.is_empty());
        assert_eq!(
            resp.error_message.as_deref(),
            Some("Research request exceeded 300-second timeout")
        );
    }

    #[test]
    fn test_other_errors_are_internal() {
        let resp = ResearchResponse::from_result(Err(ResearchError::Runner("task panicked".into())));
        assert_eq!(resp.error_message.as_deref(), Some("Internal error: task panicked"));
    }

    #[test]
    fn test_health_serializes_ok() {
        let v = serde_json::to_value(HealthResponse::default()).unwrap();
        assert_eq!(v, serde_json::json!({"status": "ok"}));
    }
}
