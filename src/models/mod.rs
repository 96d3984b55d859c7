use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod interaction;
pub mod preferences;
pub mod tmdb;

pub use interaction::{Interaction, InteractionAction};
pub use preferences::{PreferenceList, DEFAULT_PREFERENCE_CAP, EXTENDED_PREFERENCE_CAP};

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    Book,
    Music,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Series => write!(f, "series"),
            MediaKind::Book => write!(f, "book"),
            MediaKind::Music => write!(f, "music"),
        }
    }
}

/// A catalog entry shown to the client
///
/// Immutable once fetched; two items with the same `id` are the same item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Runtime in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cast: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<f64>,
}

impl MediaItem {
    /// True when any of the item's genres matches any of the labels
    pub fn matches_any_genre(&self, labels: &[String]) -> bool {
        self.genres
            .iter()
            .any(|genre| labels.iter().any(|label| genre_matches(label, genre)))
    }
}

/// Case-insensitive genre match with substring containment in either direction
///
/// "sci" matches "Science Fiction", and "Action & Adventure" matches "action".
pub fn genre_matches(label: &str, genre: &str) -> bool {
    let label = label.trim().to_lowercase();
    let genre = genre.trim().to_lowercase();
    if label.is_empty() || genre.is_empty() {
        return false;
    }
    label.contains(&genre) || genre.contains(&label)
}

/// An item picked for a client on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChosenRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Derived view of a client's daily quota
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub limit: usize,
    pub remaining: usize,
    pub limit_reached: bool,
    pub persistent: bool,
}

#[cfg(test)]
pub(crate) fn test_item(id: &str, genres: &[&str]) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        kind: MediaKind::Movie,
        title: format!("Title {}", id),
        description: String::new(),
        image: None,
        rating: 7.0,
        year: Some(2020),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        duration: None,
        cast: Vec::new(),
        director: None,
        author: None,
        artist: None,
        user_rating: None,
    }
}
