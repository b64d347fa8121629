//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：输入完整消息序列与可用工具声明，
//! 返回一条 assistant 消息（纯文本或携带 ToolRequest）。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::memory::Message;

/// 提供给模型的工具声明（函数名、描述、参数 JSON Schema）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum LlmError {
    /// 请求构造失败（参数非法）
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 网络或服务端错误
    #[error("provider error: {0}")]
    Provider(String),

    /// 返回内容无法解析
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成；返回的消息角色必须为 Assistant
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message, LlmError>;

    /// 模型名（日志用）
    fn model_name(&self) -> &str;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
