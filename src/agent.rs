//! Headless 客服 Agent 运行时
//!
//! HTTP 层与库调用方共用的入口：校验 thread_id，持有会话锁，跑一次 Agent 循环并返回最终回复。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentBuilder, AgentComponents, AgentError, ThreadLocks};
use crate::memory::{CheckpointStore, Message};
use crate::react::{react_loop, ReactSession};

/// thread_id 最大长度（字符数）
pub const MAX_THREAD_ID_LEN: usize = 256;

/// 校验 thread_id：去掉首尾空白后非空，且不超过 256 个字符
pub fn validate_thread_id(thread_id: &str) -> Result<&str, AgentError> {
    let trimmed = thread_id.trim();
    if trimmed.is_empty() {
        return Err(AgentError::InvalidRequest("thread_id must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_THREAD_ID_LEN {
        return Err(AgentError::InvalidRequest(format!(
            "thread_id must be at most {MAX_THREAD_ID_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// 客服 Agent：共享组件 + 会话锁表
pub struct SupportAgent {
    components: AgentComponents,
    locks: ThreadLocks,
}

impl SupportAgent {
    /// 按配置构建全部组件（LLM、工具、检查点存储）
    pub async fn start(config: AppConfig) -> Result<Self, AgentError> {
        let components = AgentBuilder::new(config).build().await?;
        Ok(Self::from_components(components))
    }

    pub fn from_components(components: AgentComponents) -> Self {
        Self {
            components,
            locks: ThreadLocks::new(),
        }
    }

    pub fn components(&self) -> &AgentComponents {
        &self.components
    }

    pub fn store(&self) -> Arc<dyn CheckpointStore> {
        Arc::clone(&self.components.store)
    }

    /// 处理一条用户消息，返回最后一条消息的文本
    pub async fn chat(&self, thread_id: &str, message: &str) -> Result<String, AgentError> {
        let thread_id = validate_thread_id(thread_id)?;
        let _guard = self.locks.acquire(thread_id).await;

        let c = &self.components;
        let session = ReactSession::new(&c.planner, &c.executor, c.store.as_ref())
            .with_max_steps(c.max_steps)
            .with_store_timeout(c.store_timeout);

        let result = react_loop(&session, thread_id, message).await?;
        let (prompt_tokens, completion_tokens, total_tokens) = c.planner.token_usage();
        tracing::info!(
            thread_id,
            steps = result.steps,
            version = result.version,
            messages = result.messages.len(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "chat turn complete"
        );

        if let Some(keep) = c.checkpoint_keep {
            // 清理失败不影响本次回复
            match c.store.prune(thread_id, keep.max(1)).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(thread_id, removed, "pruned checkpoints"),
                Err(e) => tracing::warn!(thread_id, error = %e, "checkpoint prune failed"),
            }
        }

        Ok(result.response)
    }

    /// 会话当前持久化的消息历史；不存在时为空
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, AgentError> {
        let thread_id = validate_thread_id(thread_id)?;
        let checkpoint = self.components.store.load(thread_id).await?;
        Ok(checkpoint.map(|cp| cp.messages).unwrap_or_default())
    }

    /// 关闭存储连接池
    pub async fn shutdown(&self) {
        self.components.store.close().await;
        tracing::info!(backend = self.components.store.backend(), "checkpoint store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::MemoryCheckpointStore;

    async fn agent_with(llm: MockLlmClient, keep: Option<usize>) -> SupportAgent {
        let mut cfg = AppConfig::default();
        cfg.agent.checkpoint_keep = keep;
        let components = AgentBuilder::new(cfg)
            .with_llm(Arc::new(llm))
            .with_store(Arc::new(MemoryCheckpointStore::new()))
            .build()
            .await
            .unwrap();
        SupportAgent::from_components(components)
    }

    #[test]
    fn test_validate_thread_id() {
        assert_eq!(validate_thread_id("  abc ").unwrap(), "abc");
        assert!(matches!(validate_thread_id("   "), Err(AgentError::InvalidRequest(_))));
        assert!(validate_thread_id(&"x".repeat(256)).is_ok());
        assert!(validate_thread_id(&"x".repeat(257)).is_err());
    }

    #[tokio::test]
    async fn test_chat_and_history() {
        let agent = agent_with(MockLlmClient::new().reply("Hello!"), None).await;
        assert_eq!(agent.chat("t1", "hi").await.unwrap(), "Hello!");

        let history = agent.history("t1").await.unwrap();
        assert_eq!(history, vec![Message::user("hi"), Message::assistant("Hello!")]);
        assert!(agent.history("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_thread_rejected_before_model_call() {
        let llm = MockLlmClient::new().reply("never");
        let agent = agent_with(llm, None).await;
        let err = agent.chat(" ", "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
        assert!(agent.history("t1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_keep_prunes_old_versions() {
        let agent = agent_with(MockLlmClient::new().reply("A1").reply("A2"), Some(1)).await;
        agent.chat("t1", "Q1").await.unwrap();
        agent.chat("t1", "Q2").await.unwrap();

        let store = agent.store();
        let history = store.history("t1", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].messages.len(), 4);
    }
}
