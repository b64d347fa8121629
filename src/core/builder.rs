//! Agent 构建器：统一的组件初始化逻辑
//!
//! 从配置创建 LLM、工具集、检查点存储与 Planner；测试可注入 Mock LLM 与内存存储，无需真实服务。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{connect_store, redact_url, CheckpointStore};
use crate::react::{load_system_prompt, Planner};
use crate::tools::{support_tools, ToolExecutor};

/// 预构建的 Agent 组件，可多请求共享
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub store: Arc<dyn CheckpointStore>,
    pub max_steps: usize,
    pub store_timeout: Duration,
    /// 每次请求后保留的检查点数
    pub checkpoint_keep: Option<usize>,
}

/// Agent 构建器
pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    store: Option<Arc<dyn CheckpointStore>>,
    system_prompt: Option<String>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            store: None,
            system_prompt: None,
        }
    }

    /// 使用指定的 LLM（默认按配置创建）
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 使用指定的检查点存储（默认按连接串连接）
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 设置系统提示词（默认读取配置文件或内置人设）
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub async fn build(self) -> Result<AgentComponents, AgentError> {
        let cfg = self.config;

        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&cfg),
        };

        let store = match self.store {
            Some(store) => store,
            None => {
                let url = cfg.database.connection_url();
                tracing::info!(url = %redact_url(&url), max_connections = cfg.database.max_connections, "connecting checkpoint store");
                connect_store(&url, cfg.database.max_connections, cfg.database.acquire_timeout()).await?
            }
        };

        let system_prompt = self
            .system_prompt
            .unwrap_or_else(|| load_system_prompt(cfg.agent.system_prompt_path.as_deref()));

        let executor = ToolExecutor::new(support_tools(), cfg.agent.tool_timeout_secs);
        let planner = Planner::new(llm, system_prompt)
            .with_tools(executor.specs())
            .with_timeout(Duration::from_secs(cfg.llm.timeouts.request));

        tracing::info!(
            model = planner.model_name(),
            store = store.backend(),
            tools = ?executor.tool_names(),
            "agent components ready"
        );

        Ok(AgentComponents {
            planner,
            executor,
            store,
            max_steps: cfg.agent.max_steps,
            store_timeout: cfg.database.statement_timeout(),
            checkpoint_keep: cfg.agent.checkpoint_keep,
        })
    }
}
