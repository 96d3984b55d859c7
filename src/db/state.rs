//! Per-client key/value persistence used by the daily quota.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::AppResult;

/// Key/value store holding raw string values
///
/// Implementations only need to give read-your-writes consistency for a single caller; no
/// cross-call locking is expected.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// In-process store used in tests and when no Redis URL is configured
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
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

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryStateStore::new();
        assert_eq!(store.get("quota:abc:chosen").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStateStore::new();
        assert_ok!(store.set("k", "v1".to_string()).await);
        assert_ok!(store.set("k", "v2".to_string()).await);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryStateStore::new();
        assert_ok!(store.set("k", "v".to_string()).await);
        assert_ok!(store.remove("k").await);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.name(), "memory");
    }
}
