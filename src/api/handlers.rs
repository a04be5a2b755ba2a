//! 路由处理函数

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::stream::{self, Stream};
use tokio::sync::{mpsc, oneshot};

use crate::api::models::{ErrorBody, HealthResponse, ResearchRequest, ResearchResponse};
use crate::api::AppState;
use crate::core::{run_with_deadline, validate_topic, ResearchError};
use crate::research::{ResearchEvent, ResearchOutcome};

fn unprocessable(detail: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// 解析并校验请求体；失败时返回 422
fn parse_topic(payload: Result<Json<ResearchRequest>, JsonRejection>) -> Result<String, Response> {
    let Json(req) = payload.map_err(|rejection| unprocessable(rejection.body_text()))?;
    validate_topic(&req.topic)
        .map(String::from)
        .map_err(|e| unprocessable(e.to_string()))
}

/// 在独立任务中带截止时间运行；任务 panic 转为 ResearchError::Runner
async fn run_isolated(
    state: &AppState,
    topic: String,
    events: Option<mpsc::UnboundedSender<ResearchEvent>>,
) -> Result<ResearchOutcome, ResearchError> {
    let runner = Arc::clone(&state.runner);
    let deadline = state.request_timeout;
    tokio::spawn(async move { run_with_deadline(runner.as_ref(), &topic, deadline, events).await })
        .await
        .unwrap_or_else(|e| Err(ResearchError::Runner(e.to_string())))
}

fn log_response(topic: &str, response: &ResearchResponse) {
    if response.success || response.summary.is_some() {
        tracing::info!(
            topic = %topic,
            success = response.success,
            source_count = response.sources.len(),
            "Research completed"
        );
    } else {
        tracing::error!(
            topic = %topic,
            error = response.error_message.as_deref().unwrap_or(""),
            "Research failed"
        );
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// POST /api/v1/research
pub async fn research(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let topic = match parse_topic(payload) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    tracing::info!(topic = %topic, "Research request received");

    let response = ResearchResponse::from_result(run_isolated(&state, topic.clone(), None).await);
    log_response(&topic, &response);
    Json(response).into_response()
}

fn research_event(ev: &ResearchEvent) -> Event {
    Event::default()
        .event(ev.name())
        .data(serde_json::to_string(ev).unwrap_or_default())
}

fn result_event(resp: &ResearchResponse) -> Event {
    Event::default()
        .event("result")
        .data(serde_json::to_string(resp).unwrap_or_default())
}

/// 先转发过程事件，事件通道关闭后再发出最终 result 事件
fn event_stream(
    events: mpsc::UnboundedReceiver<ResearchEvent>,
    done: oneshot::Receiver<ResearchResponse>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some((events, done)), |st| async move {
        let (mut events, done) = st?;
        match events.recv().await {
            Some(ev) => Some((Ok(research_event(&ev)), Some((events, done)))),
            None => {
                let resp = done.await.unwrap_or_else(|_| {
                    ResearchResponse::failure("Internal error: research task ended unexpectedly")
                });
                Some((Ok(result_event(&resp)), None))
            }
        }
    })
}

/// POST /api/v1/research/stream：SSE 推送进度，最后一条为 result
pub async fn research_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let topic = match parse_topic(payload) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    tracing::info!(topic = %topic, "Streaming research request received");

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ResearchEvent>();
    let (done_tx, done_rx) = oneshot::channel::<ResearchResponse>();
    tokio::spawn(async move {
        let result = run_isolated(&state, topic.clone(), Some(event_tx)).await;
        let response = ResearchResponse::from_result(result);
        log_response(&topic, &response);
        let _ = done_tx.send(response);
    });

    Sse::new(event_stream(event_rx, done_rx))
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(15))
                .text("keepalive"),
        )
        .into_response()
}
