//! Key/value backends for the persisted JSON state

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Active session
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Saved student credentials
pub const STUDENT_USER_KEY: &str = "studentUser";
/// Saved librarian credentials
pub const LIBRARIAN_USER_KEY: &str = "librarianUser";
/// The loan ledger
pub const LOGGED_IN_STUDENTS_KEY: &str = "loggedInStudents";
/// Registry of registered students
pub const ALL_STUDENTS_KEY: &str = "allStudents";

/// String key/value storage. Values are JSON documents.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: String) -> AppResult<()>;
    async fn remove(&self, key: &str) -> AppResult<()>;
    async fn ping(&self) -> AppResult<()>;
}

/// Process-local store, the default backend and the one used in tests
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Redis-backed store; every key is namespaced with a prefix
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Open a client and check the server answers
    pub async fn connect(url: &str, prefix: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Storage(format!("Failed to create Redis client: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to get Redis connection: {}", e)))?;

        let store = Self {
            manager,
            prefix: prefix.to_string(),
        };
        store.ping().await?;
        Ok(store)
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Shared connection; the manager reconnects after a dropped link
    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.connection();
        conn.set::<_, _, ()>(self.key(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection();
        conn.del::<_, ()>(self.key(key)).await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Storage(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }
}

/// Read a JSON value. A missing key or an unparsable document reads as the
/// default; parse failures are logged and otherwise swallowed.
pub async fn read_json<T>(store: &dyn KeyValueStore, key: &str) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(T::default());
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!("Discarding unreadable value under '{}': {}", key, e);
            Ok(T::default())
        }
    }
}

/// Read a JSON value for a read-modify-write. A missing key reads as the
/// default; an unparsable document is an error so it is never overwritten
/// with a fresh default.
pub async fn read_json_strict<T>(store: &dyn KeyValueStore, key: &str) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(T::default());
    };

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Storage(format!("Unreadable value under '{}': {}", key, e)))
}

/// Serialize and store a whole JSON value
pub async fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> AppResult<()>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}
