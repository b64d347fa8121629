//! HTTP 接口
//!
//! `POST /chat`：`{thread_id, message}` → `{status: "success", response}`；失败时 `{detail}`。
//! `GET /health`：存活检查。

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::agent::SupportAgent;
use crate::core::AgentError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    pub status: String,
    pub response: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "chat request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "chat request rejected");
        }
        let body = ErrorBody {
            detail: self.public_detail(),
        };
        (status, Json(body)).into_response()
    }
}

/// 构建路由
pub fn router(agent: Arc<SupportAgent>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(|| async { "OK" }))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(agent)
}

async fn chat(
    State(agent): State<Arc<SupportAgent>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AgentError> {
    // JSON 无效或缺字段统一按 400 返回（axum 默认为 422）
    let Json(req) = payload.map_err(|e| AgentError::InvalidRequest(e.body_text()))?;
    let response = agent.chat(&req.thread_id, &req.message).await?;
    Ok(Json(ChatResponse {
        status: "success".to_string(),
        response,
    }))
}
