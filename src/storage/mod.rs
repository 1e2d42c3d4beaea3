/// Persistent store collaborator
///
/// The engine persists user configuration (the weight table) as JSON values
/// through this trait; the actual backing store lives outside this crate.
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage key for the persisted weight table
pub const WEIGHTS_KEY: &str = "weights";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn save(&self, key: &str, value: Value) -> Result<()>;
    async fn last_updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>>;
}

/// In-memory storage, useful for tests and demos
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, (Value, DateTime<Utc>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, Utc::now()));
        Ok(())
    }

    async fn last_updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|(_, updated)| *updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();

        assert!(storage.load("missing").await.unwrap().is_none());
        assert!(storage.last_updated_at("missing").await.unwrap().is_none());

        storage.save("k", json!({"a": 1})).await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), Some(json!({"a": 1})));
        assert!(storage.last_updated_at("k").await.unwrap().is_some());
    }
}
