use std::future::Future;

use super::schema::Database;
use super::types::{StoreReadError, StoreWriteError};

/// String blob store addressed by key.
///
/// `set` overwrites the whole value; a reader never sees a partial write.
pub trait KeyValueStore {
    fn get(&self, key: &str)
        -> impl Future<Output = Result<Option<String>, StoreReadError>> + Send;

    fn set(&self, key: &str, value: &str)
        -> impl Future<Output = Result<(), StoreWriteError>> + Send;
}

impl Database {
    // ========================================================================
    // Key-Value Operations
    // ========================================================================

    /// Get the value stored under `key`, or `None` if never set.
    pub async fn get_value(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM key_value_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Store `value` under `key` (UPSERT), replacing any previous value.
    pub async fn set_value(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO key_value_store (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreReadError> {
        self.get_value(key)
            .await
            .map_err(|e| StoreReadError(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreWriteError> {
        self.set_value(key, value)
            .await
            .map_err(|e| StoreWriteError(e.to_string()))
    }
}
