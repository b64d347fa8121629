//! Agent 错误类型与 HTTP 映射
//!
//! 按调用方能否处理分三类：请求本身有误（4xx）、上游不可用（502/503/504，可重试）、内部错误（500）。

use axum::http::StatusCode;
use thiserror::Error;

use crate::llm::LlmError;
use crate::memory::CheckpointError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("LLM timeout after {0}s")]
    LlmTimeout(u64),

    #[error("Checkpoint store error: {0}")]
    Store(CheckpointError),

    #[error("Checkpoint store timeout after {0}s")]
    StoreTimeout(u64),

    #[error("Concurrent update on thread {0}")]
    CheckpointConflict(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {reason}")]
    ToolArguments { tool: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<CheckpointError> for AgentError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Conflict { thread_id, .. } => AgentError::CheckpointConflict(thread_id),
            other => AgentError::Store(other),
        }
    }
}

impl AgentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::CheckpointConflict(_) => StatusCode::CONFLICT,
            AgentError::LlmError(_)
            | AgentError::UnknownTool(_)
            | AgentError::ToolArguments { .. }
            | AgentError::ToolExecutionFailed(_)
            | AgentError::ToolTimeout(_) => StatusCode::BAD_GATEWAY,
            AgentError::LlmTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AgentError::Store(_) | AgentError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::StepLimitExceeded(_) | AgentError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回给调用方的描述：4xx 原样返回，5xx 只给类别，细节写日志
    pub fn public_detail(&self) -> String {
        match self {
            AgentError::InvalidRequest(_) | AgentError::CheckpointConflict(_) => self.to_string(),
            AgentError::LlmError(_) => "model provider unavailable".to_string(),
            AgentError::LlmTimeout(_) => "model provider timed out".to_string(),
            AgentError::Store(_) | AgentError::StoreTimeout(_) => {
                "conversation store unavailable".to_string()
            }
            AgentError::UnknownTool(name) => format!("model requested unknown tool: {name}"),
            AgentError::ToolArguments { tool, .. } => {
                format!("model sent invalid arguments for tool: {tool}")
            }
            AgentError::ToolExecutionFailed(_) | AgentError::ToolTimeout(_) => {
                "tool execution failed".to_string()
            }
            AgentError::StepLimitExceeded(_) => "agent did not finish within the step limit".to_string(),
            AgentError::ConfigError(_) => "internal error".to_string(),
        }
    }

    /// 上游暂时不可用，调用方可重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status_code(),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ) || matches!(self, AgentError::CheckpointConflict(_))
    }
}
