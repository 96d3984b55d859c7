use std::{collections::HashMap, sync::Arc};

use crate::{
    models::{Interaction, MediaItem},
    services::{
        providers::{CatalogSource, StaticCatalog},
        quota::QuotaStore,
        reranker::{recent_history, Reranker},
        selector,
    },
};

/// Items returned per recommendation request
pub const RECOMMENDATION_COUNT: usize = 10;

/// Where a batch of candidates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateStage {
    GenreSearch,
    Popular,
    StaticFallback,
}

/// Stages in the order they are tried; evaluation stops at the first non-empty one
const PIPELINE: [CandidateStage; 3] = [
    CandidateStage::GenreSearch,
    CandidateStage::Popular,
    CandidateStage::StaticFallback,
];

impl CandidateStage {
    fn from_network(self) -> bool {
        !matches!(self, CandidateStage::StaticFallback)
    }

    fn label(self) -> &'static str {
        match self {
            CandidateStage::GenreSearch => "genre_search",
            CandidateStage::Popular => "popular",
            CandidateStage::StaticFallback => "static_fallback",
        }
    }
}

/// Best-effort recommendation pipeline
///
/// Tries the catalog by genre, then the catalog's popular list, then the bundled dataset.
/// Network candidates optionally go through the re-ranker before the quota-aware random
/// selection. No step's failure reaches the caller.
pub struct RecommendationService {
    catalog: Arc<dyn CatalogSource>,
    reranker: Option<Arc<dyn Reranker>>,
    fallback: StaticCatalog,
}

impl RecommendationService {
    pub fn new(catalog: Arc<dyn CatalogSource>, reranker: Option<Arc<dyn Reranker>>) -> Self {
        Self {
            catalog,
            reranker,
            fallback: StaticCatalog::bundled(),
        }
    }

    pub fn with_fallback(mut self, fallback: StaticCatalog) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn fallback(&self) -> &StaticCatalog {
        &self.fallback
    }

    /// Up to [`RECOMMENDATION_COUNT`] items, possibly none
    pub async fn get_recommendations(
        &self,
        preferences: &[String],
        history: &[Interaction],
        quota: &dyn QuotaStore,
    ) -> Vec<MediaItem> {
        let Some((stage, candidates)) = self.gather(preferences).await else {
            tracing::warn!("No recommendation candidates from any source");
            return Vec::new();
        };

        tracing::info!(
            stage = stage.label(),
            candidates = candidates.len(),
            provider = self.catalog.name(),
            "Recommendation candidates gathered"
        );

        let candidates = if stage.from_network() {
            self.rerank(preferences, history, candidates).await
        } else {
            candidates
        };

        let picked = selector::select(candidates, RECOMMENDATION_COUNT, quota).await;

        tracing::info!(
            stage = stage.label(),
            returned = picked.len(),
            "Recommendations selected"
        );

        picked
    }

    async fn gather(&self, preferences: &[String]) -> Option<(CandidateStage, Vec<MediaItem>)> {
        for stage in PIPELINE {
            let items = self.candidates(stage, preferences).await;
            if !items.is_empty() {
                return Some((stage, items));
            }
            tracing::debug!(stage = stage.label(), "Stage yielded nothing, moving on");
        }
        None
    }

    async fn candidates(&self, stage: CandidateStage, preferences: &[String]) -> Vec<MediaItem> {
        let result = match stage {
            CandidateStage::GenreSearch => {
                if preferences.is_empty() {
                    return Vec::new();
                }
                self.catalog.search_by_genres(preferences).await
            }
            CandidateStage::Popular => self.catalog.popular().await,
            CandidateStage::StaticFallback => self.fallback.popular().await,
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                stage = stage.label(),
                provider = self.catalog.name(),
                "Candidate stage failed"
            );
            Vec::new()
        })
    }

    async fn rerank(
        &self,
        preferences: &[String],
        history: &[Interaction],
        candidates: Vec<MediaItem>,
    ) -> Vec<MediaItem> {
        let Some(reranker) = &self.reranker else {
            return candidates;
        };

        match reranker
            .rerank(preferences, recent_history(history), &candidates)
            .await
        {
            Ok(ids) if !ids.is_empty() => {
                let ranked = apply_ranking(candidates, &ids);
                tracing::debug!(
                    reranker = reranker.name(),
                    kept = ranked.len(),
                    "Applied re-ranking"
                );
                ranked
            }
            Ok(_) => candidates,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reranker = reranker.name(),
                    "Re-ranking failed, keeping catalog order"
                );
                candidates
            }
        }
    }
}

/// Candidates in `ids` order, keeping only those named; unknown ids are dropped
pub fn apply_ranking(candidates: Vec<MediaItem>, ids: &[String]) -> Vec<MediaItem> {
    let mut by_id: HashMap<String, MediaItem> = HashMap::with_capacity(candidates.len());
    for item in candidates {
        by_id.entry(item.id.clone()).or_insert(item);
    }

    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
