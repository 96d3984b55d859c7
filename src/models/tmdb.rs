// ============================================================================
// TMDB API Types
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{MediaItem, MediaKind};

pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const CAST_LIMIT: usize = 5;

/// Paged list response (`/movie/popular`, `/discover/tv`, `/search/multi`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
}

/// Entry of a paged list; movies carry `title`/`release_date`, series `name`/`first_air_date`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Only present on `/search/multi` results
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPerson {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbPerson>,
    #[serde(default)]
    pub crew: Vec<TmdbPerson>,
}

/// `/movie/{id}` and `/tv/{id}` response, requested with `append_to_response=credits`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub created_by: Vec<TmdbPerson>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

fn poster_url(path: Option<String>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", TMDB_IMAGE_BASE, p))
}

/// Leading four-digit year of a `YYYY-MM-DD` date
fn parse_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn rounded_rating(vote_average: Option<f64>) -> f64 {
    (vote_average.unwrap_or(0.0) * 10.0).round() / 10.0
}

impl TmdbListItem {
    /// Kind declared by `/search/multi`; `None` for people and other non-title results
    pub fn declared_kind(&self) -> Option<MediaKind> {
        match self.media_type.as_deref() {
            Some("movie") => Some(MediaKind::Movie),
            Some("tv") => Some(MediaKind::Series),
            _ => None,
        }
    }

    /// Converts a list entry, resolving genre ids through `genre_names`
    pub fn into_media_item(self, kind: MediaKind, genre_names: &HashMap<u32, String>) -> MediaItem {
        let mut genres: Vec<String> = Vec::new();
        for name in self.genre_ids.iter().filter_map(|id| genre_names.get(id)) {
            if !genres.contains(name) {
                genres.push(name.clone());
            }
        }

        let date = self.release_date.or(self.first_air_date);

        MediaItem {
            id: self.id.to_string(),
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            description: self.overview.unwrap_or_default(),
            image: poster_url(self.poster_path),
            rating: rounded_rating(self.vote_average),
            year: parse_year(date.as_deref()),
            genres,
            duration: None,
            cast: Vec::new(),
            director: None,
            author: None,
            artist: None,
            user_rating: None,
        }
    }
}

impl TmdbDetails {
    pub fn into_media_item(self, kind: MediaKind) -> MediaItem {
        let credits = self.credits.unwrap_or_default();

        let director = match kind {
            MediaKind::Series => self.created_by.first().map(|p| p.name.clone()),
            _ => credits
                .crew
                .iter()
                .find(|p| p.job.as_deref() == Some("Director"))
                .map(|p| p.name.clone()),
        };

        let duration = self
            .runtime
            .or_else(|| self.episode_run_time.first().copied())
            .filter(|minutes| *minutes > 0);

        let date = self.release_date.or(self.first_air_date);

        MediaItem {
            id: self.id.to_string(),
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            description: self.overview.unwrap_or_default(),
            image: poster_url(self.poster_path),
            rating: rounded_rating(self.vote_average),
            year: parse_year(date.as_deref()),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            duration,
            cast: credits
                .cast
                .into_iter()
                .take(CAST_LIMIT)
                .map(|p| p.name)
                .collect(),
            director,
            author: None,
            artist: None,
            user_rating: None,
        }
    }
}
