//! SQLite 检查点存储（本地开发 / 测试）
//!
//! 与 Postgres 实现同一张表结构；消息以 JSON 文本存储。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;

use crate::memory::{Checkpoint, CheckpointError, CheckpointStore, Message};

type CheckpointRow = (String, i64, Json<Vec<Message>>, DateTime<Utc>);

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// url 形如 `sqlite:data/checkpoints.db?mode=rwc`
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, CheckpointError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// 打开（不存在则创建）文件数据库并建表
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let store = Self::connect(&url, 5, Duration::from_secs(5)).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn into_checkpoint((thread_id, version, messages, created_at): CheckpointRow) -> Checkpoint {
        Checkpoint {
            thread_id,
            version,
            messages: messages.0,
            created_at,
        }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT thread_id, version, messages, created_at FROM checkpoints
             WHERE thread_id = ? ORDER BY version DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Self::into_checkpoint))
    }

    async fn save(
        &self,
        thread_id: &str,
        expected_version: i64,
        messages: &[Message],
    ) -> Result<Checkpoint, CheckpointError> {
        let version = expected_version + 1;
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO checkpoints (thread_id, version, messages, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(version)
        .bind(Json(messages))
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Checkpoint {
                thread_id: thread_id.to_string(),
                version,
                messages: messages.to_vec(),
                created_at,
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CheckpointError::Conflict {
                    thread_id: thread_id.to_string(),
                    version,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn history(&self, thread_id: &str, limit: usize) -> Result<Vec<Checkpoint>, CheckpointError> {
        let rows: Vec<CheckpointRow> = sqlx::query_as(
            "SELECT thread_id, version, messages, created_at FROM checkpoints
             WHERE thread_id = ? ORDER BY version DESC LIMIT ?",
        )
        .bind(thread_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Self::into_checkpoint).collect())
    }

    async fn prune(&self, thread_id: &str, keep: usize) -> Result<u64, CheckpointError> {
        let result = sqlx::query(
            "DELETE FROM checkpoints WHERE thread_id = ? AND version NOT IN (
                SELECT version FROM checkpoints WHERE thread_id = ? ORDER BY version DESC LIMIT ?
            )",
        )
        .bind(thread_id)
        .bind(thread_id)
        .bind(keep as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id  TEXT NOT NULL,
                version    INTEGER NOT NULL,
                messages   TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, version)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
