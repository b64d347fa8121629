//! 建表命令：在服务启动前对检查点存储执行一次幂等迁移
//!
//! 用法：`support-agent-migrate [config.toml]`，连接串来自 DATABASE_URL 或配置文件。

use std::path::PathBuf;

use anyhow::Context;
use support_agent::{
    config::load_config,
    memory::{connect_store, redact_url},
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let url = cfg.database.connection_url();

    let store = connect_store(&url, 1, cfg.database.acquire_timeout())
        .await
        .with_context(|| format!("Failed to connect {}", redact_url(&url)))?;
    store.migrate().await.context("Migration failed")?;
    tracing::info!(backend = store.backend(), url = %redact_url(&url), "checkpoint schema ready");

    store.close().await;
    Ok(())
}
