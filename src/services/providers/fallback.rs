//! Bundled fallback catalog, used when every network source comes back empty.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;

use crate::{
    error::AppResult,
    models::{MediaItem, MediaKind},
    services::providers::{CatalogSource, RandomKind},
};

static BUNDLED: Lazy<Arc<Vec<MediaItem>>> = Lazy::new(|| {
    match serde_json::from_str::<Vec<MediaItem>>(include_str!("../../../data/fallback_media.json"))
    {
        Ok(items) => Arc::new(items),
        Err(e) => {
            tracing::error!(error = %e, "Bundled fallback dataset is invalid");
            Arc::new(Vec::new())
        }
    }
});

/// In-memory catalog over a fixed item list
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    items: Arc<Vec<MediaItem>>,
}

impl StaticCatalog {
    /// Catalog over the dataset compiled into the binary
    pub fn bundled() -> Self {
        Self {
            items: BUNDLED.clone(),
        }
    }

    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

#[async_trait::async_trait]
impl CatalogSource for StaticCatalog {
    async fn search_by_genres(&self, labels: &[String]) -> AppResult<Vec<MediaItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.matches_any_genre(labels))
            .cloned()
            .collect())
    }

    async fn popular(&self) -> AppResult<Vec<MediaItem>> {
        let mut items = self.items.to_vec();
        items.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        Ok(items)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<MediaItem>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .items
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn details(&self, id: &str) -> AppResult<Option<MediaItem>> {
        Ok(self.get(id).cloned())
    }

    async fn random_title(&self, kind: RandomKind) -> AppResult<Option<MediaItem>> {
        let candidates: Vec<&MediaItem> = self
            .items
            .iter()
            .filter(|item| match kind {
                RandomKind::Movie => item.kind == MediaKind::Movie,
                RandomKind::Series => item.kind == MediaKind::Series,
                RandomKind::Random => matches!(item.kind, MediaKind::Movie | MediaKind::Series),
            })
            .collect();

        let mut rng = rand::thread_rng();
        Ok(candidates.choose(&mut rng).map(|item| (*item).clone()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bundled_dataset_loads() {
        let catalog = StaticCatalog::bundled();
        assert!(catalog.items().len() >= 10);

        let ids: HashSet<&str> = catalog.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.items().len(), "ids must be unique");
        assert!(catalog
            .items()
            .iter()
            .all(|i| i.id.chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn test_bundled_dataset_covers_all_kinds() {
        let catalog = StaticCatalog::bundled();
        for kind in [MediaKind::Movie, MediaKind::Series, MediaKind::Book, MediaKind::Music] {
            assert!(catalog.items().iter().any(|i| i.kind == kind), "missing {}", kind);
        }
    }

    #[tokio::test]
    async fn test_search_by_genres_matches_loosely() {
        let catalog = StaticCatalog::bundled();
        let items = catalog
            .search_by_genres(&["sci-fi".to_string()])
            .await
            .unwrap();
        assert!(!items.is_empty());
        assert!(items
            .iter()
            .all(|i| i.genres.iter().any(|g| g.to_lowercase().contains("sci-fi"))));
    }

    #[tokio::test]
    async fn test_popular_sorted_by_rating() {
        let catalog = StaticCatalog::bundled();
        let items = catalog.popular().await.unwrap();
        assert_eq!(items.len(), catalog.items().len());
        assert!(items.windows(2).all(|w| w[0].rating >= w[1].rating));
    }

    #[tokio::test]
    async fn test_search_and_details() {
        let catalog = StaticCatalog::bundled();
        let found = catalog.search("breaking").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1396");

        assert!(catalog.search("  ").await.unwrap().is_empty());
        assert_eq!(catalog.details("1396").await.unwrap().unwrap().title, "Breaking Bad");
        assert_eq!(catalog.details("0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_random_title_respects_kind() {
        let catalog = StaticCatalog::bundled();
        for _ in 0..20 {
            let item = catalog.random_title(RandomKind::Series).await.unwrap().unwrap();
            assert_eq!(item.kind, MediaKind::Series);
        }

        let empty = StaticCatalog::new(Vec::new());
        assert_eq!(empty.random_title(RandomKind::Random).await.unwrap(), None);
    }
}
