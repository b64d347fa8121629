//! Support Agent - 带工具调用与会话检查点的客服 Agent 服务
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（校验、会话锁、单轮对话）
//! - **api**: axum 路由（`POST /chat`、`GET /health`）与错误响应
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、会话锁、组件构建、优雅关闭
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 消息模型与检查点存储（Postgres / SQLite / 内存）
//! - **react**: Planner 与 Agent 主循环
//! - **tools**: 退款查询、库存查询与执行器

pub mod agent;
pub mod api;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use agent::SupportAgent;
pub use core::AgentError;
