use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Invalid data for key {key}: {reason}")]
    InvalidData { key: String, reason: String },
}

/// Flat key-value storage of JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    #[must_use]
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    #[must_use]
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

pub struct PostgresKeyValueStore {
    pool: PgPool,
}

impl PostgresKeyValueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for PostgresKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT value
            FROM settings
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Value, _>("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Either backing store, chosen at startup from configuration.
pub enum SettingsBackend {
    Memory(InMemoryKeyValueStore),
    Postgres(PostgresKeyValueStore),
}

#[async_trait]
impl KeyValueStore for SettingsBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self {
            SettingsBackend::Memory(store) => store.get(key).await,
            SettingsBackend::Postgres(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        match self {
            SettingsBackend::Memory(store) => store.set(key, value).await,
            SettingsBackend::Postgres(store) => store.set(key, value).await,
        }
    }
}
