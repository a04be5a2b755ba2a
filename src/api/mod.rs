//! HTTP 服务边界：健康检查、同步研究接口与 SSE 流式接口
//!
//! 研究逻辑的失败一律以 200 + success=false 返回；只有请求体不合法时返回 422。

pub mod handlers;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::AppConfig;
use crate::core::{ResearchError, ResearchRunner};
use crate::research::Researcher;

pub use models::{ErrorBody, HealthResponse, ResearchRequest, ResearchResponse};

/// 路由共享状态：运行器在启动时构造一次，所有请求共用
pub struct AppState {
    pub runner: Arc<dyn ResearchRunner>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(runner: Arc<dyn ResearchRunner>, request_timeout: Duration) -> Self {
        Self {
            runner,
            request_timeout,
        }
    }

    /// 由配置构造生产运行器；搜索后端或 LLM 提供方不受支持时直接失败
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ResearchError> {
        let researcher = Researcher::from_app_config(cfg)?;
        Ok(Self::new(
            Arc::new(researcher),
            Duration::from_secs(cfg.server.request_timeout_secs),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/research", post(handlers::research))
        .route("/api/v1/research/stream", post(handlers::research_stream))
        .with_state(Arc::new(state))
}
