use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the user did with a shown item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Like,
    Dislike,
    Superlike,
    Skip,
}

impl InteractionAction {
    /// Positive actions feed genres into the preference list
    pub fn is_positive(&self) -> bool {
        matches!(self, InteractionAction::Like | InteractionAction::Superlike)
    }
}

impl std::fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionAction::Like => write!(f, "like"),
            InteractionAction::Dislike => write!(f, "dislike"),
            InteractionAction::Superlike => write!(f, "superlike"),
            InteractionAction::Skip => write!(f, "skip"),
        }
    }
}

/// One user action, produced by the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub item_id: String,
    pub action: InteractionAction,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn new(item_id: impl Into<String>, action: InteractionAction) -> Self {
        Self {
            item_id: item_id.into(),
            action,
            timestamp: Utc::now(),
        }
    }
}
