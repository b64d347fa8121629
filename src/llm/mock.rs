//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预置回复；预置回复用完后回显最后一条 User 消息。
//! 每次调用收到的消息序列都会记录下来，便于断言 system 提示与历史拼接。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, ToolSpec};
use crate::memory::{Message, Role, ToolRequest};

/// 一条预置回复
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    ToolCalls(Vec<ToolRequest>),
    Error(String),
}

/// Mock 客户端
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条纯文本回复
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()))
    }

    /// 追加一条请求单个工具的回复
    pub fn tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("call_{}", uuid::Uuid::new_v4().simple());
        self.push(MockReply::ToolCalls(vec![ToolRequest::new(id, name, arguments)]))
    }

    /// 追加一条一次请求多个工具的回复
    pub fn tool_calls(self, requests: Vec<ToolRequest>) -> Self {
        self.push(MockReply::ToolCalls(requests))
    }

    /// 追加一次失败
    pub fn error(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Error(message.into()))
    }

    fn push(self, reply: MockReply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    /// 每次 complete 收到的完整消息序列
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(MockReply::Text(text)) => Ok(Message::assistant(text)),
            Some(MockReply::ToolCalls(requests)) => Ok(Message::assistant_with_tools("", requests)),
            Some(MockReply::Error(e)) => Err(LlmError::Provider(e)),
            None => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                Ok(Message::assistant(format!("Echo from Mock: {last_user}")))
            }
        }
    }
}
