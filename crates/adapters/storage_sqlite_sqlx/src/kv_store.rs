//! `SQLite` implementation of [`KeyValueStore`].
//!
//! Every path is stored as one row keyed by its `/`-joined segments, the
//! value serialized as JSON text. Deleting a path removes its whole subtree.

use sqlx::SqlitePool;

use homecore_app::ports::KeyValueStore;
use homecore_domain::error::HubError;
use serde_json::Value;

use crate::error::StorageError;

const SELECT_BY_PATH: &str = "SELECT value FROM storage WHERE path = ?";

const UPSERT: &str = r"
    INSERT INTO storage (path, value, updated_at)
    VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    ON CONFLICT(path) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

const DELETE_SUBTREE: &str = r"
    DELETE FROM storage
    WHERE path = ? OR substr(path, 1, length(?) + 1) = ? || '/'
";

/// `SQLite`-backed key/value store.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn join(path: &[&str]) -> Result<String, StorageError> {
    let joined = path.join("/");
    if path.is_empty()
        || path
            .iter()
            .any(|segment| segment.is_empty() || segment.contains('/'))
    {
        return Err(StorageError::InvalidPath(joined));
    }
    Ok(joined)
}

impl KeyValueStore for SqliteKeyValueStore {
    async fn read(&self, path: &[&str]) -> Result<Option<Value>, HubError> {
        let key = join(path)?;
        let row: Option<(String,)> = sqlx::query_as(SELECT_BY_PATH)
            .bind(&key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        match row {
            Some((text,)) => Ok(Some(
                serde_json::from_str(&text).map_err(StorageError::from)?,
            )),
            None => Ok(None),
        }
    }

    async fn write(&self, path: &[&str], value: Value) -> Result<(), HubError> {
        let key = join(path)?;
        let text = serde_json::to_string(&value).map_err(StorageError::from)?;

        sqlx::query(UPSERT)
            .bind(&key)
            .bind(&text)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        tracing::debug!(path = %key, "value stored");
        Ok(())
    }

    async fn delete(&self, path: &[&str]) -> Result<(), HubError> {
        let key = join(path)?;

        let result = sqlx::query(DELETE_SUBTREE)
            .bind(&key)
            .bind(&key)
            .bind(&key)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        tracing::debug!(path = %key, rows = result.rows_affected(), "values deleted");
        Ok(())
    }
}
