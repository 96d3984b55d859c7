//! Media catalog abstraction
//!
//! A catalog source answers genre, popularity, free-text and id lookups over movies and
//! series. `TmdbProvider` is the network catalog; `StaticCatalog` is the bundled dataset the
//! recommendation pipeline falls back to when the network yields nothing.

use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{MediaItem, MediaKind},
};

pub mod fallback;
pub mod tmdb;

pub use fallback::StaticCatalog;
pub use tmdb::TmdbProvider;

/// Kind filter for random title picks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomKind {
    Movie,
    Series,
    #[default]
    Random,
}

impl RandomKind {
    /// Concrete kind, flipping a coin for `Random`
    pub fn resolve(self) -> MediaKind {
        match self {
            RandomKind::Movie => MediaKind::Movie,
            RandomKind::Series => MediaKind::Series,
            RandomKind::Random => {
                if rand::random::<bool>() {
                    MediaKind::Movie
                } else {
                    MediaKind::Series
                }
            }
        }
    }
}

/// Trait for media catalog sources
///
/// Implementations report failures as errors; callers that must not fail (the
/// recommendation pipeline) treat an error as an empty result.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Items whose genres match any of `labels` (case-insensitive, containment either way)
    async fn search_by_genres(&self, labels: &[String]) -> AppResult<Vec<MediaItem>>;

    /// Generic popular items
    async fn popular(&self) -> AppResult<Vec<MediaItem>>;

    /// Free-text title search
    async fn search(&self, query: &str) -> AppResult<Vec<MediaItem>>;

    /// Full details for one item, `None` when the id is unknown
    async fn details(&self, id: &str) -> AppResult<Option<MediaItem>>;

    /// A random title of the requested kind
    async fn random_title(&self, kind: RandomKind) -> AppResult<Option<MediaItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Merges the results of two concurrent sub-queries
///
/// One failing side is logged and ignored; only when both fail is the first error returned.
pub(crate) fn merge_results(
    provider: &'static str,
    first: AppResult<Vec<MediaItem>>,
    second: AppResult<Vec<MediaItem>>,
) -> AppResult<Vec<MediaItem>> {
    match (first, second) {
        (Ok(mut a), Ok(b)) => {
            a.extend(b);
            Ok(a)
        }
        (Ok(items), Err(e)) | (Err(e), Ok(items)) => {
            tracing::warn!(
                error = %e,
                provider = provider,
                kept = items.len(),
                "Partial catalog fetch failure"
            );
            Ok(items)
        }
        (Err(e), Err(other)) => {
            tracing::error!(error = %other, provider = provider, "Both catalog sub-queries failed");
            Err(e)
        }
    }
}
