//! 检查点存储抽象
//!
//! 每个会话（thread）的完整消息历史按版本号递增保存；load 读取最新版本。
//! save 携带期望版本（乐观并发）：写入 expected + 1，已存在时返回 Conflict。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::memory::Message;

/// 某会话在某一时刻的消息快照
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    /// 从 1 开始递增
    pub version: i64,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint conflict on thread {thread_id}: version {version} already written")]
    Conflict { thread_id: String, version: i64 },

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported store url: {0}")]
    UnsupportedUrl(String),
}

impl From<sqlx::Error> for CheckpointError {
    fn from(e: sqlx::Error) -> Self {
        CheckpointError::Database(e.to_string())
    }
}

/// 检查点存储接口：Postgres / SQLite / 内存三种实现
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// 最新检查点；会话不存在时返回 None
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// 写入 expected_version + 1；expected_version 为 0 表示会话尚无检查点
    async fn save(
        &self,
        thread_id: &str,
        expected_version: i64,
        messages: &[Message],
    ) -> Result<Checkpoint, CheckpointError>;

    /// 最近 limit 个检查点，新到旧
    async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>, CheckpointError>;

    /// 仅保留最近 keep 个检查点，返回删除条数
    async fn prune(&self, thread_id: &str, keep: usize) -> Result<u64, CheckpointError>;

    /// 建表（幂等）；由独立的迁移命令调用
    async fn migrate(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    /// 释放连接池
    async fn close(&self) {}

    fn backend(&self) -> &'static str;
}

/// 内存检查点存储：测试与 `DATABASE_URL=memory` 时使用，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|cps| cps.last().cloned()))
    }

    async fn save(
        &self,
        thread_id: &str,
        expected_version: i64,
        messages: &[Message],
    ) -> Result<Checkpoint, CheckpointError> {
        let mut threads = self.threads.write().await;
        let checkpoints = threads.entry(thread_id.to_string()).or_default();
        let latest = checkpoints.last().map(|cp| cp.version).unwrap_or(0);
        let version = expected_version + 1;
        if latest != expected_version {
            return Err(CheckpointError::Conflict {
                thread_id: thread_id.to_string(),
                version,
            });
        }
        let checkpoint = Checkpoint {
            thread_id: thread_id.to_string(),
            version,
            messages: messages.to_vec(),
            created_at: Utc::now(),
        };
        checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>, CheckpointError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|cps| cps.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn prune(&self, thread_id: &str, keep: usize) -> Result<u64, CheckpointError> {
        let mut threads = self.threads.write().await;
        let Some(checkpoints) = threads.get_mut(thread_id) else {
            return Ok(0);
        };
        let excess = checkpoints.len().saturating_sub(keep);
        checkpoints.drain(..excess);
        Ok(excess as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
