//! Planner：模型步
//!
//! 把固定的 system 提示临时拼在历史之前，连同工具声明一起交给 LLM，得到一条 assistant 消息。
//! system 提示不会写回历史，因此多轮对话里不会重复累积。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::core::AgentError;
use crate::llm::{LlmClient, LlmError, ToolSpec};
use crate::memory::{Message, Role};

/// 内置客服人设
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a highly efficient, professional technical support agent. \
Your job is to assist users with their accounts, refunds, and inventory checks. \
Never break character. If you do not have a tool to answer a question, apologize and say you cannot help.";

/// 读取系统提示词：指定文件可读且非空时使用文件内容，否则用内置人设
pub fn load_system_prompt(path: Option<&Path>) -> String {
    path.and_then(|p| match std::fs::read_to_string(p) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %p.display(), error = %e, "system prompt file unreadable, using built-in prompt");
            None
        }
    })
    .map(|text| text.trim().to_string())
    .filter(|text| !text.is_empty())
    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}

/// Planner：持有 LLM、system prompt、工具声明与单次调用超时
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    tools: Vec<ToolSpec>,
    timeout: Duration,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 模型步：[system] + history → 一条 assistant 消息
    pub async fn plan(&self, history: &[Message]) -> Result<Message, AgentError> {
        let mut full_messages = Vec::with_capacity(history.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(history);

        let reply = tokio::time::timeout(self.timeout, self.llm.complete(&full_messages, &self.tools))
            .await
            .map_err(|_| AgentError::LlmTimeout(self.timeout.as_secs()))??;

        if reply.role != Role::Assistant {
            return Err(LlmError::InvalidResponse(format!(
                "expected assistant reply, got {:?}",
                reply.role
            ))
            .into());
        }
        Ok(reply)
    }
}
