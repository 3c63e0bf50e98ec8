use crate::ReplyLedger;
use bot_core::{CoreError, StorageError};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Reply counters in a SQLite table. Each increment is a single upsert, so
/// concurrent processes sharing the database never lose one.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::from)?
            .create_if_missing(true);

        // Every connection to an in-memory database is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StorageError::from)?;

        let ledger = Self { pool };
        ledger.run_migrations().await?;
        info!("Connected reply ledger at {}", database_url);
        Ok(ledger)
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationFailed {
                migration: e.to_string(),
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ReplyLedger for SqliteLedger {
    async fn get(&self, thread_id: &str) -> Result<u32, CoreError> {
        let replies: Option<i64> =
            sqlx::query_scalar("SELECT replies FROM thread_replies WHERE thread_id = ?")
                .bind(thread_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;

        Ok(replies.unwrap_or(0).max(0) as u32)
    }

    async fn increment(&self, thread_id: &str) -> Result<u32, CoreError> {
        let replies: i64 = sqlx::query_scalar(
            "INSERT INTO thread_replies (thread_id, replies, updated_at) VALUES (?, 1, ?) \
             ON CONFLICT(thread_id) DO UPDATE \
             SET replies = replies + 1, updated_at = excluded.updated_at \
             RETURNING replies",
        )
        .bind(thread_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;

        debug!("Thread {} now has {} replies", thread_id, replies);
        Ok(replies.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_increment_and_get() {
        let ledger = SqliteLedger::connect("sqlite::memory:").await.unwrap();

        assert_eq!(ledger.get("abc").await.unwrap(), 0);
        assert_eq!(ledger.increment("abc").await.unwrap(), 1);
        assert_eq!(ledger.increment("abc").await.unwrap(), 2);
        assert_eq!(ledger.get("abc").await.unwrap(), 2);
        assert_eq!(ledger.get("def").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let ledger = SqliteLedger::connect("sqlite::memory:").await.unwrap();
        ledger.increment("abc").await.unwrap();

        ledger.run_migrations().await.unwrap();
        assert_eq!(ledger.get("abc").await.unwrap(), 1);
    }
}
