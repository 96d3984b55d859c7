pub mod cache;
pub mod state;

mod macros;

pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheWriterHandle;
pub use cache::CacheKey;
pub use state::RedisStateStore;
