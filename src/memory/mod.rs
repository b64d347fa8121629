//! 记忆层：会话消息模型与检查点持久化（Postgres / SQLite / 内存）

pub mod checkpoint;
pub mod conversation;
pub mod postgres;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, MemoryCheckpointStore};
pub use conversation::{Message, Role, ToolRequest};
pub use postgres::PostgresCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// 按连接串选择存储后端：`memory` / `sqlite:...` / `postgres://...`（或 `postgresql://`）
pub async fn connect_store(
    url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    if url == "memory" {
        return Ok(Arc::new(MemoryCheckpointStore::new()));
    }
    if url.starts_with("sqlite:") {
        let store = SqliteCheckpointStore::connect(url, max_connections, acquire_timeout).await?;
        return Ok(Arc::new(store));
    }
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresCheckpointStore::connect(url, max_connections, acquire_timeout).await?;
        return Ok(Arc::new(store));
    }
    Err(CheckpointError::UnsupportedUrl(redact_url(url)))
}

/// 日志与错误中隐藏连接串里的密码
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
