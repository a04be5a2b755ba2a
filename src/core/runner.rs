//! 运行器抽象与调用方截止时间
//!
//! 编排器自身没有超时；调用方（HTTP 服务 / CLI）用 run_with_deadline 包住整次运行，
//! 超时即丢弃进行中的 future 与其局部状态，改由调用方给出超时结果。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::core::ResearchError;
use crate::research::{ResearchEvent, ResearchOutcome};

/// 执行一次完整研究的能力；Researcher 为生产实现，测试可替换为假实现
#[async_trait]
pub trait ResearchRunner: Send + Sync {
    async fn research(
        &self,
        topic: &str,
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> Result<ResearchOutcome, ResearchError>;
}

/// 校验主题：去掉首尾空白后不得为空
pub fn validate_topic(topic: &str) -> Result<&str, ResearchError> {
    let topic = topic.trim();
    if topic.is_empty() {
        Err(ResearchError::InvalidTopic)
    } else {
        Ok(topic)
    }
}

/// 在截止时间内运行；超时返回 ResearchError::Timeout
pub async fn run_with_deadline(
    runner: &dyn ResearchRunner,
    topic: &str,
    deadline: Duration,
    events: Option<UnboundedSender<ResearchEvent>>,
) -> Result<ResearchOutcome, ResearchError> {
    let topic = validate_topic(topic)?;
    match tokio::time::timeout(deadline, runner.research(topic, events)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(topic = %topic, deadline_secs = deadline.as_secs(), "research timeout");
            Err(ResearchError::Timeout(deadline.as_secs()))
        }
    }
}
