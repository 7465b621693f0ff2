//! # Local Storage Module
//!
//! Persistent string key/value storage standing in for a browser's local
//! storage, plus the session cache built on top of it.
//!
//! ## Key Components
//!
//! - `LocalStorage`: async get/set/remove over string keys
//! - `SqliteStorage`: SQLite-backed implementation (WAL mode)
//! - `MemoryStorage`: process-local implementation for tests and ephemeral runs
//! - `SessionCache`: reads and writes the serialized `AuthUser`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authsync::client::local_store::{SessionCache, SqliteStorage};
//!
//! # async fn example() -> Result<(), authsync::shared::ServiceError> {
//! let storage = SqliteStorage::open("/tmp/authsync/storage.db").await?;
//! let cache = SessionCache::new(Arc::new(storage));
//! let cached = cache.load_user().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::client::types::AuthUser;
use crate::shared::error::ServiceError;

/// Key holding the serialized current user
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Key holding the persisted provider session
pub const AUTH_SESSION_KEY: &str = "authSession";

/// Current storage schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// String key/value storage
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ServiceError>;

    async fn remove_item(&self, key: &str) -> Result<(), ServiceError>;
}

/// SQLite-backed local storage
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open or create the storage file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::storage(format!("create {}: {}", parent.display(), e)))?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let pool = SqlitePool::connect(&database_url).await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

        let storage = Self { pool };
        storage.init_schema().await?;
        tracing::debug!("Opened local storage at {}", path.display());
        Ok(storage)
    }

    /// Storage that lives only as long as this value
    pub async fn in_memory() -> Result<Self, ServiceError> {
        // one connection, otherwise every pooled connection gets its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), ServiceError> {
        sqlx::query(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let current_version: (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if current_version.0 < CURRENT_SCHEMA_VERSION {
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(CURRENT_SCHEMA_VERSION)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LocalStorage for SqliteStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        sqlx::query(
            "INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ServiceError> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// In-process local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), ServiceError> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

/// Serialized copy of the current user.
///
/// Write-through only: nothing expires and nothing is revalidated.
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn LocalStorage>,
}

impl SessionCache {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    pub async fn store_user(&self, user: &AuthUser) -> Result<(), ServiceError> {
        let json = serde_json::to_string(user)?;
        self.storage.set_item(CURRENT_USER_KEY, &json).await
    }

    pub async fn load_user(&self) -> Result<Option<AuthUser>, ServiceError> {
        match self.storage.get_item(CURRENT_USER_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn clear_user(&self) -> Result<(), ServiceError> {
        self.storage.remove_item(CURRENT_USER_KEY).await
    }
}
