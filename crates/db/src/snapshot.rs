use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use thiserror::Error;

use studioflow_core::store::{SnapshotStore, StoreError};

use crate::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

impl RepositoryError {
    pub fn into_store_error(self, key: &str) -> StoreError {
        match self {
            Self::Decode(message) => StoreError::Decode { key: key.to_string(), message },
            Self::Encode(message) => StoreError::Encode { key: key.to_string(), message },
            Self::Database(error) => StoreError::Backend(format!("database error: {error}")),
        }
    }
}

/// Snapshot store backed by the `kv_store` table.
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: DbPool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn read(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("value")?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| RepositoryError::Decode(error.to_string()))
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(value)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.read(key).await.map_err(|error| error.into_store_error(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.write(key, &value).await.map_err(|error| error.into_store_error(key))?;
        tracing::debug!(event_name = "store.snapshot.written", key, "snapshot written");
        Ok(())
    }
}
