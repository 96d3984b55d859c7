//! TMDB (The Movie Database) catalog provider
//!
//! Movies and series live in separate TMDB namespaces, so every list operation issues one
//! movie and one tv request concurrently and merges the results. Genre labels are resolved to
//! TMDB genre ids through the (cached) genre lists before calling `/discover`.
//!
//! API Flow:
//! 1. Genre lists: /genre/movie/list, /genre/tv/list
//! 2. Genre search: /discover/{movie,tv}?with_genres=a|b
//! 3. Popular: /{movie,tv}/popular
//! 4. Search: /search/multi
//! 5. Details: /movie/{id} then /tv/{id}

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        genre_matches,
        tmdb::{TmdbDetails, TmdbGenre, TmdbGenreList, TmdbListItem, TmdbPage},
        MediaItem, MediaKind,
    },
    services::providers::{merge_results, CatalogSource, RandomKind},
};
use rand::{seq::SliceRandom, Rng};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const LIST_CACHE_TTL: u64 = 3600; // 1 hour
const GENRE_CACHE_TTL: u64 = 86400; // 1 day
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
/// TMDB refuses page numbers past this
const MAX_DISCOVER_PAGES: u32 = 1000;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            cache,
        }
    }

    fn segment(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Series => "tv",
            _ => "movie",
        }
    }

    /// GET a TMDB path; `Ok(None)` on 404, `SourceUnavailable` on any other failure status
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<Option<T>> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::SourceUnavailable(format!(
                "TMDB returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        let data = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to deserialize TMDB response");
            AppError::SourceUnavailable(format!("Failed to parse TMDB response: {}", e))
        })?;

        Ok(Some(data))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        self.get_optional(path, params)
            .await?
            .ok_or_else(|| AppError::SourceUnavailable(format!("TMDB path {} not found", path)))
    }

    /// Genre id → name for one kind
    async fn genre_names(&self, kind: MediaKind) -> AppResult<HashMap<u32, String>> {
        let genres: Vec<TmdbGenre> = cached!(
            self.cache,
            CacheKey::GenreList(kind),
            GENRE_CACHE_TTL,
            async move {
                let path = format!("/genre/{}/list", Self::segment(kind));
                let list: TmdbGenreList = self.get_json(&path, &[]).await?;
                AppResult::Ok(list.genres)
            }
        )?;

        Ok(genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    /// Fetches one page of a list endpoint and converts it to media items
    async fn fetch_page(
        &self,
        kind: MediaKind,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<TmdbPage<TmdbListItem>> {
        let page: TmdbPage<TmdbListItem> = self.get_json(path, params).await?;
        tracing::debug!(
            path = %path,
            kind = %kind,
            page = page.page,
            results = page.results.len(),
            "TMDB page fetched"
        );
        Ok(page)
    }

    async fn fetch_list(
        &self,
        kind: MediaKind,
        key: CacheKey,
        path: String,
        params: Vec<(&'static str, String)>,
    ) -> AppResult<Vec<MediaItem>> {
        cached!(self.cache, key, LIST_CACHE_TTL, async move {
            let genre_names = self.genre_names(kind).await?;
            let page = self.fetch_page(kind, &path, &params).await?;
            let items: Vec<MediaItem> = page
                .results
                .into_iter()
                .map(|entry| entry.into_media_item(kind, &genre_names))
                .collect();
            AppResult::Ok(items)
        })
    }

    async fn discover(&self, kind: MediaKind, genre_ids: &[u32]) -> AppResult<Vec<MediaItem>> {
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");

        self.fetch_list(
            kind,
            CacheKey::GenreSearch(kind, joined.clone()),
            format!("/discover/{}", Self::segment(kind)),
            vec![
                ("with_genres", joined),
                ("sort_by", "popularity.desc".to_string()),
            ],
        )
        .await
    }

    async fn popular_of(&self, kind: MediaKind) -> AppResult<Vec<MediaItem>> {
        self.fetch_list(
            kind,
            CacheKey::Popular(kind),
            format!("/{}/popular", Self::segment(kind)),
            Vec::new(),
        )
        .await
    }

    async fn details_of(&self, kind: MediaKind, id: &str) -> AppResult<Option<MediaItem>> {
        cached!(
            self.cache,
            CacheKey::Details(kind, id.to_string()),
            DETAILS_CACHE_TTL,
            async move {
                let path = format!("/{}/{}", Self::segment(kind), id);
                let details: Option<TmdbDetails> = self
                    .get_optional(&path, &[("append_to_response", "credits".to_string())])
                    .await?;
                AppResult::Ok(details.map(|d| d.into_media_item(kind)))
            }
        )
    }
}

/// Genre ids whose names match any label
pub fn resolve_genre_ids(labels: &[String], genre_names: &HashMap<u32, String>) -> Vec<u32> {
    let mut ids: Vec<u32> = genre_names
        .iter()
        .filter(|(_, name)| labels.iter().any(|label| genre_matches(label, name)))
        .map(|(id, _)| *id)
        .collect();
    ids.sort_unstable();
    ids
}

#[async_trait::async_trait]
impl CatalogSource for TmdbProvider {
    async fn search_by_genres(&self, labels: &[String]) -> AppResult<Vec<MediaItem>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }

        let (movie_genres, tv_genres) = tokio::join!(
            self.genre_names(MediaKind::Movie),
            self.genre_names(MediaKind::Series)
        );
        let movie_ids = resolve_genre_ids(labels, &movie_genres?);
        let tv_ids = resolve_genre_ids(labels, &tv_genres?);

        tracing::debug!(
            labels = ?labels,
            movie_genres = ?movie_ids,
            tv_genres = ?tv_ids,
            "Resolved genre labels"
        );

        let (movies, series) = tokio::join!(
            self.discover(MediaKind::Movie, &movie_ids),
            self.discover(MediaKind::Series, &tv_ids)
        );
        let items = merge_results(self.name(), movies, series)?;

        tracing::info!(
            labels = labels.len(),
            results = items.len(),
            provider = "tmdb",
            "Genre search completed"
        );

        Ok(items)
    }

    async fn popular(&self) -> AppResult<Vec<MediaItem>> {
        let (movies, series) = tokio::join!(
            self.popular_of(MediaKind::Movie),
            self.popular_of(MediaKind::Series)
        );
        let items = merge_results(self.name(), movies, series)?;

        tracing::info!(results = items.len(), provider = "tmdb", "Popular fetch completed");

        Ok(items)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<MediaItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::TitleSearch(query.to_string()),
            LIST_CACHE_TTL,
            async move {
                let (movie_genres, tv_genres) = tokio::join!(
                    self.genre_names(MediaKind::Movie),
                    self.genre_names(MediaKind::Series)
                );
                let (movie_genres, tv_genres) = (movie_genres?, tv_genres?);

                let page = self
                    .fetch_page(
                        MediaKind::Movie,
                        "/search/multi",
                        &[
                            ("query", query.to_string()),
                            ("include_adult", "false".to_string()),
                        ],
                    )
                    .await?;

                let items: Vec<MediaItem> = page
                    .results
                    .into_iter()
                    .filter_map(|entry| {
                        let kind = entry.declared_kind()?;
                        let genres = match kind {
                            MediaKind::Series => &tv_genres,
                            _ => &movie_genres,
                        };
                        Some(entry.into_media_item(kind, genres))
                    })
                    .collect();

                tracing::info!(
                    query = %query,
                    results = items.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                AppResult::Ok(items)
            }
        )
    }

    async fn details(&self, id: &str) -> AppResult<Option<MediaItem>> {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Ok(None);
        }

        if let Some(movie) = self.details_of(MediaKind::Movie, id).await? {
            return Ok(Some(movie));
        }
        self.details_of(MediaKind::Series, id).await
    }

    async fn random_title(&self, kind: RandomKind) -> AppResult<Option<MediaItem>> {
        let kind = kind.resolve();
        let path = format!("/discover/{}", Self::segment(kind));
        let sort = ("sort_by", "popularity.desc".to_string());

        let first = self.fetch_page(kind, &path, &[sort.clone()]).await?;
        let total_pages = first.total_pages.clamp(1, MAX_DISCOVER_PAGES);
        let page_number = {
            let mut rng = rand::thread_rng();
            rng.gen_range(1..=total_pages)
        };

        let page = if page_number == 1 {
            first
        } else {
            self.fetch_page(kind, &path, &[sort, ("page", page_number.to_string())])
                .await?
        };

        let choice = {
            let mut rng = rand::thread_rng();
            page.results.choose(&mut rng).map(|e| e.id)
        };
        let Some(choice) = choice else {
            tracing::info!(kind = %kind, page = page_number, "Random page had no results");
            return Ok(None);
        };

        tracing::info!(
            kind = %kind,
            page = page_number,
            total_pages = total_pages,
            id = choice,
            "Random title picked"
        );

        self.details_of(kind, &choice.to_string()).await
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
