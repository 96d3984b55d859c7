use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchpick_api::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_redis_client, Cache, CacheWriterHandle, MemoryStateStore, RedisStateStore,
        StateStore,
    },
    services::{CatalogSource, GeminiReranker, Reranker, SystemClock, TmdbProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchpick_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (store, cache, cache_writer): (Arc<dyn StateStore>, Cache, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (cache, writer) = Cache::new(client.clone()).await;
                let store: Arc<dyn StateStore> = Arc::new(RedisStateStore::new(client));
                tracing::info!("Using Redis for quota state and catalog cache");
                (store, cache, Some(writer))
            }
            None => {
                let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
                tracing::warn!("REDIS_URL not set, quota state is in-memory and caching is off");
                (store, Cache::disabled(), None)
            }
        };

    tracing::info!(
        state_store = store.name(),
        catalog_cache = cache.is_enabled(),
        "Storage configured"
    );

    let catalog: Arc<dyn CatalogSource> = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_language.clone(),
    ));

    let reranker: Option<Arc<dyn Reranker>> = match config.gemini_key() {
        Some(key) => Some(Arc::new(GeminiReranker::new(
            key.to_string(),
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
        ))),
        None => {
            tracing::info!("GEMINI_API_KEY not set, re-ranking disabled");
            None
        }
    };

    let state = AppState::new(
        catalog,
        reranker,
        Some(store),
        Arc::new(SystemClock),
        config.preference_cap,
    );
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
