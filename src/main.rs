//! 客服 Agent HTTP 服务
//!
//! 入口：初始化日志、加载配置、连接检查点存储并启动 `POST /chat`。
//! 用法：`support-agent [config.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use support_agent::{
    agent::SupportAgent,
    api,
    config::load_config,
    core::ShutdownManager,
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    tracing::debug!(?cfg, "config loaded");
    let bind_addr = cfg.server.bind_addr();

    let agent = Arc::new(
        SupportAgent::start(cfg)
            .await
            .context("Failed to start agent")?,
    );

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "support agent listening");

    axum::serve(listener, api::router(Arc::clone(&agent)))
        .with_graceful_shutdown(shutdown.wait_for_shutdown())
        .await
        .context("HTTP server failed")?;

    agent.shutdown().await;
    Ok(())
}
