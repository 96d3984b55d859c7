//! Generative re-ranking of recommendation candidates
//!
//! A re-ranker receives the user's preference labels, their recent interactions and the
//! candidate list, and answers with candidate ids in the order it thinks fits best. Model
//! output is free-form text, so ids are pulled out of it with [`extract_ranked_ids`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{AppError, AppResult},
    models::{Interaction, MediaItem},
};

pub mod gemini;

pub use gemini::GeminiReranker;

/// Candidates beyond this are left out of the prompt
pub const MAX_PROMPT_CANDIDATES: usize = 20;
/// Interactions beyond the most recent ones are left out of the prompt
pub const MAX_HISTORY: usize = 20;
pub const MAX_RANKED_IDS: usize = 10;

static NUMERIC_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Reranker: Send + Sync {
    /// Ordered candidate ids, at most [`MAX_RANKED_IDS`], each drawn from `candidates`
    async fn rerank(
        &self,
        preferences: &[String],
        history: &[Interaction],
        candidates: &[MediaItem],
    ) -> AppResult<Vec<String>>;

    fn name(&self) -> &'static str;
}

/// The last [`MAX_HISTORY`] interactions
pub fn recent_history(history: &[Interaction]) -> &[Interaction] {
    &history[history.len().saturating_sub(MAX_HISTORY)..]
}

/// First unique numeric tokens of `text` that name a candidate, in order of appearance
///
/// Tokens that match no candidate are ignored. No match at all is a `RerankFailure`.
pub fn extract_ranked_ids(text: &str, candidates: &[MediaItem]) -> AppResult<Vec<String>> {
    let known: HashSet<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    let mut ids: Vec<String> = Vec::new();

    for token in NUMERIC_TOKEN.find_iter(text).map(|m| m.as_str()) {
        if ids.len() >= MAX_RANKED_IDS {
            break;
        }
        if known.contains(token) && !ids.iter().any(|id| id == token) {
            ids.push(token.to_string());
        }
    }

    if ids.is_empty() {
        return Err(AppError::RerankFailure(
            "Response contained no candidate ids".to_string(),
        ));
    }

    Ok(ids)
}

/// Natural-language prompt asking for a ranked id list
pub fn build_prompt(
    preferences: &[String],
    history: &[Interaction],
    candidates: &[MediaItem],
) -> String {
    let mut prompt = String::from(
        "You recommend movies and series. Rank the candidates below by how well they fit \
         the user's taste.\n\n",
    );

    if preferences.is_empty() {
        prompt.push_str("Preferred genres: none recorded yet\n");
    } else {
        prompt.push_str(&format!("Preferred genres: {}\n", preferences.join(", ")));
    }

    let recent = recent_history(history);
    if !recent.is_empty() {
        prompt.push_str("Recent interactions (oldest first):\n");
        for interaction in recent {
            let title = candidates
                .iter()
                .find(|c| c.id == interaction.item_id)
                .map(|c| c.title.as_str())
                .unwrap_or("unknown title");
            prompt.push_str(&format!(
                "- {} item {} ({})\n",
                interaction.action, interaction.item_id, title
            ));
        }
    }

    prompt.push_str("\nCandidates:\n");
    for item in candidates.iter().take(MAX_PROMPT_CANDIDATES) {
        let year = item.year.map(|y| y.to_string()).unwrap_or_default();
        prompt.push_str(&format!(
            "- id {}: {} [{}, {}] genres: {}; rating {:.1}\n",
            item.id,
            item.title,
            item.kind,
            year,
            item.genres.join(", "),
            item.rating
        ));
    }

    prompt.push_str(&format!(
        "\nAnswer with up to {} candidate ids, best first, separated by commas. \
         Do not include any other numbers.",
        MAX_RANKED_IDS
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{test_item, InteractionAction};

    fn candidates(ids: &[&str]) -> Vec<MediaItem> {
        ids.iter().map(|id| test_item(id, &["Drama"])).collect()
    }

    #[test]
    fn test_extract_in_order_of_appearance() {
        let ids = extract_ranked_ids("3, 1", &candidates(&["1", "2", "3"])).unwrap();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_extract_ignores_unknown_and_duplicate_tokens() {
        let text = "My picks: 42 (not a candidate), then 2, then 2 again, and finally 1.";
        let ids = extract_ranked_ids(text, &candidates(&["1", "2", "3"])).unwrap();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_extract_caps_at_ten() {
        let all: Vec<String> = (1..=15).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        let text = all.join(" ");
        let ids = extract_ranked_ids(&text, &candidates(&refs)).unwrap();
        assert_eq!(ids.len(), MAX_RANKED_IDS);
        assert_eq!(ids[9], "10");
    }

    #[test]
    fn test_extract_does_not_match_inside_longer_numbers() {
        let result = extract_ranked_ids("27205", &candidates(&["272", "05"]));
        assert!(matches!(result, Err(AppError::RerankFailure(_))));
    }

    #[test]
    fn test_extract_without_ids_fails() {
        let result = extract_ranked_ids("I cannot help with that.", &candidates(&["1"]));
        assert!(matches!(result, Err(AppError::RerankFailure(_))));
    }

    #[test]
    fn test_recent_history_keeps_last_twenty() {
        let history: Vec<Interaction> = (0..25)
            .map(|i| Interaction::new(i.to_string(), InteractionAction::Like))
            .collect();
        let recent = recent_history(&history);
        assert_eq!(recent.len(), MAX_HISTORY);
        assert_eq!(recent[0].item_id, "5");
        assert_eq!(recent_history(&history[..3]).len(), 3);
    }

    #[test]
    fn test_prompt_caps_candidates_and_lists_preferences() {
        let ids: Vec<String> = (1..=30).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let prompt = build_prompt(
            &["Drama".to_string(), "Comedy".to_string()],
            &[Interaction::new("3", InteractionAction::Superlike)],
            &candidates(&refs),
        );

        assert!(prompt.contains("Preferred genres: Drama, Comedy"));
        assert!(prompt.contains("- superlike item 3 (Title 3)"));
        assert!(prompt.contains("- id 20: Title 20"));
        assert!(!prompt.contains("- id 21: Title 21"));
    }
}
