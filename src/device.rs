/// Device-local persistent store
///
/// A small SQLite-backed key/value store holding the state the client
/// persists between launches: the authorization cache entry and the
/// failed-login throttle keys.
use crate::error::{PartnerError, PartnerResult};
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::path::Path;

/// Device store handle
#[derive(Clone)]
pub struct DeviceStore {
    pool: SqlitePool,
}

impl DeviceStore {
    /// Open (or create) the device store at the given path
    pub async fn open(path: &Path) -> PartnerResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool = SqlitePool::connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(PartnerError::Database)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests. Pinned to one connection so every reader
    /// sees the same in-memory database.
    pub async fn in_memory() -> PartnerResult<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .map_err(PartnerError::Database)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> PartnerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS device_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(PartnerError::Database)?;

        Ok(())
    }

    /// Read a value by key
    pub async fn get(&self, key: &str) -> PartnerResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM device_kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(PartnerError::Database)?;

        if let Some(row) = row {
            Ok(Some(row.try_get("value")?))
        } else {
            Ok(None)
        }
    }

    /// Write a value under a key, replacing any previous value
    pub async fn set(&self, key: &str, value: &str) -> PartnerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO device_kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(PartnerError::Database)?;

        Ok(())
    }

    /// Remove a key
    pub async fn remove(&self, key: &str) -> PartnerResult<()> {
        sqlx::query("DELETE FROM device_kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(PartnerError::Database)?;

        Ok(())
    }

    /// Stable per-device identifier, minted on first use
    pub async fn device_id(&self) -> PartnerResult<String> {
        const DEVICE_ID_KEY: &str = "device:id";

        if let Some(id) = self.get(DEVICE_ID_KEY).await? {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.set(DEVICE_ID_KEY, &id).await?;
        Ok(id)
    }
}
