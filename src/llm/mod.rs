//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::{MockLlmClient, MockReply};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, ToolSpec};

use crate::config::AppConfig;

/// 按配置创建 LLM 客户端：provider 为 mock 时使用 Mock，否则走 OpenAI 兼容端点
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if cfg.llm.provider.eq_ignore_ascii_case("mock") {
        tracing::warn!("LLM provider is mock, replies will echo user input");
        return Arc::new(MockLlmClient::new());
    }
    tracing::info!(model = %cfg.llm.model, base_url = %cfg.llm.base_url, "Using OpenAI-compatible LLM");
    Arc::new(
        OpenAiClient::new(
            Some(&cfg.llm.base_url),
            &cfg.llm.model,
            cfg.llm.api_key.as_deref(),
        )
        .with_temperature(cfg.llm.temperature),
    )
}
