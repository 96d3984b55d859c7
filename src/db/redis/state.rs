use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use redis::Client;

use crate::db::state::StateStore;
use crate::error::{AppError, AppResult};

/// Quota state outlives a single day only long enough to be reconciled
const STATE_TTL: u64 = 172800; // 2 days

/// Redis-backed state store
///
/// Writes are synchronous (unlike `Cache::set_in_background`) because the quota reads its
/// own writes within the same request.
#[derive(Clone)]
pub struct RedisStateStore {
    redis_client: Client,
}

impl RedisStateStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)
    }
}

fn unavailable(e: redis::RedisError) -> AppError {
    AppError::StorageUnavailable(format!("Redis state store: {}", e))
}

#[async_trait::async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(unavailable)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(key, value, STATE_TTL)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await.map_err(unavailable)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_redis_client;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_round_trip_against_redis() {
        let store = RedisStateStore::new(create_redis_client(&redis_url()).unwrap());

        store
            .set("quota:test-client:last_reset", "2024-05-01".to_string())
            .await
            .unwrap();
        let value = store.get("quota:test-client:last_reset").await.unwrap();
        assert_eq!(value.as_deref(), Some("2024-05-01"));

        store.remove("quota:test-client:last_reset").await.unwrap();
        assert_eq!(store.get("quota:test-client:last_reset").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_storage_unavailable() {
        let store = RedisStateStore::new(redis::Client::open("redis://127.0.0.1:1").unwrap());

        let result = store.get("quota:client-1:chosen").await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

        let result = store.set("quota:client-1:chosen", "[]".to_string()).await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }

    #[test]
    fn test_name() {
        let store = RedisStateStore::new(redis::Client::open("redis://127.0.0.1").unwrap());
        assert_eq!(store.name(), "redis");
    }
}
