//! Postgres 检查点存储（生产）
//!
//! 使用 sqlx 连接池；消息以 JSONB 存储，(thread_id, version) 为主键，
//! 主键冲突即视为并发写入冲突。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use crate::memory::{Checkpoint, CheckpointError, CheckpointStore, Message};

type CheckpointRow = (String, i64, Json<Vec<Message>>, DateTime<Utc>);

pub struct PostgresCheckpointStore {
    pool: PgPool,
    table: String,
}

impl PostgresCheckpointStore {
    /// 建立连接池；池满时最多等待 acquire_timeout
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, CheckpointError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            table: "checkpoints".to_string(),
        }
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
impl CheckpointStore for PostgresCheckpointStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let sql = format!(
            "SELECT thread_id, version, messages, created_at FROM {} \
             WHERE thread_id = $1 ORDER BY version DESC LIMIT 1",
            self.table
        );
        let row: Option<CheckpointRow> = sqlx::query_as(&sql)
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
        let sql = format!(
            "INSERT INTO {} (thread_id, version, messages, created_at) VALUES ($1, $2, $3, $4)",
            self.table
        );
        let result = sqlx::query(&sql)
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
        let sql = format!(
            "SELECT thread_id, version, messages, created_at FROM {} \
             WHERE thread_id = $1 ORDER BY version DESC LIMIT $2",
            self.table
        );
        let rows: Vec<CheckpointRow> = sqlx::query_as(&sql)
            .bind(thread_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Self::into_checkpoint).collect())
    }

    async fn prune(&self, thread_id: &str, keep: usize) -> Result<u64, CheckpointError> {
        let sql = format!(
            "DELETE FROM {table} WHERE thread_id = $1 AND version NOT IN (
                SELECT version FROM {table} WHERE thread_id = $1 ORDER BY version DESC LIMIT $2
            )",
            table = self.table
        );
        let result = sqlx::query(&sql)
            .bind(thread_id)
            .bind(keep as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                thread_id  TEXT NOT NULL,
                version    BIGINT NOT NULL,
                messages   JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (thread_id, version)
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table} (created_at)",
            table = self.table
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// 需要真实 Postgres：设置 SUPPORT_TEST_DATABASE_URL 后运行
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> Option<PostgresCheckpointStore> {
        let url = std::env::var("SUPPORT_TEST_DATABASE_URL").ok()?;
        let store = PostgresCheckpointStore::connect(&url, 2, Duration::from_secs(5))
            .await
            .unwrap();
        store.migrate().await.unwrap();
        Some(store)
    }

    #[tokio::test]
    async fn test_postgres_save_load_conflict() {
        let Some(store) = test_store().await else {
            return;
        };
        let thread = format!("pg-test-{}", uuid::Uuid::new_v4());

        store.save(&thread, 0, &[Message::user("Q1")]).await.unwrap();
        let err = store.save(&thread, 0, &[Message::user("Q1b")]).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Conflict { .. }));

        store
            .save(&thread, 1, &[Message::user("Q1"), Message::assistant("A1")])
            .await
            .unwrap();
        let latest = store.load(&thread).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.messages[1].content, "A1");

        assert_eq!(store.prune(&thread, 1).await.unwrap(), 1);
        store.close().await;
    }
}
