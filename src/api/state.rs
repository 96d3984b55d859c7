use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    db::StateStore,
    models::MediaItem,
    services::{CatalogSource, Clock, QuotaProvider, RecommendationService, Reranker},
};

/// Upper bound on remembered items before the index is reset to the bundled dataset
pub const MAX_INDEXED_ITEMS: usize = 10_000;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogSource>,
    pub recommender: Arc<RecommendationService>,
    pub quotas: QuotaProvider,
    pub preference_cap: usize,
    pub inner: Arc<RwLock<AppStateInner>>,
}

/// Inner state that can be modified
///
/// `items` holds every item handed out so far, so interactions can be resolved without a
/// catalog round trip.
pub struct AppStateInner {
    pub items: HashMap<String, MediaItem>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        reranker: Option<Arc<dyn Reranker>>,
        store: Option<Arc<dyn StateStore>>,
        clock: Arc<dyn Clock>,
        preference_cap: usize,
    ) -> Self {
        let recommender = RecommendationService::new(catalog.clone(), reranker);
        let items = seed_index(&recommender);

        Self {
            catalog,
            recommender: Arc::new(recommender),
            quotas: QuotaProvider::new(store, clock),
            preference_cap,
            inner: Arc::new(RwLock::new(AppStateInner { items })),
        }
    }

    /// Adds items to the lookup index
    pub async fn remember(&self, items: &[MediaItem]) {
        if items.is_empty() {
            return;
        }

        let mut inner = self.inner.write().await;
        if inner.items.len() + items.len() > MAX_INDEXED_ITEMS {
            tracing::info!(indexed = inner.items.len(), "Item index full, resetting");
            inner.items = seed_index(&self.recommender);
        }
        for item in items {
            inner.items.insert(item.id.clone(), item.clone());
        }
    }
}

fn seed_index(recommender: &RecommendationService) -> HashMap<String, MediaItem> {
    recommender
        .fallback()
        .items()
        .iter()
        .map(|item| (item.id.clone(), item.clone()))
        .collect()
}
