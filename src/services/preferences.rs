use std::collections::HashMap;

use crate::{
    models::{Interaction, MediaItem, PreferenceList},
    services::providers::StaticCatalog,
};

/// Resolves item ids to already-fetched items, without touching the network
pub trait ItemLookup {
    fn find_item(&self, id: &str) -> Option<&MediaItem>;
}

impl ItemLookup for HashMap<String, MediaItem> {
    fn find_item(&self, id: &str) -> Option<&MediaItem> {
        self.get(id)
    }
}

impl ItemLookup for [MediaItem] {
    fn find_item(&self, id: &str) -> Option<&MediaItem> {
        self.iter().find(|item| item.id == id)
    }
}

impl ItemLookup for StaticCatalog {
    fn find_item(&self, id: &str) -> Option<&MediaItem> {
        self.get(id)
    }
}

/// Folds one interaction into the preference list
///
/// Likes and superlikes append the item's genres that are not yet present, in the item's
/// genre order. Dislikes and skips leave the list as it is; demoting genres on dislike is a
/// product decision that has not been made. An item the lookup cannot resolve also leaves
/// the list unchanged.
pub fn update<L>(current: &PreferenceList, interaction: &Interaction, lookup: &L) -> PreferenceList
where
    L: ItemLookup + ?Sized,
{
    if !interaction.action.is_positive() {
        return current.clone();
    }

    let Some(item) = lookup.find_item(&interaction.item_id) else {
        tracing::debug!(item_id = %interaction.item_id, "Interaction for unknown item ignored");
        return current.clone();
    };

    let updated = PreferenceList::from_labels(
        current.labels().iter().chain(item.genres.iter()).cloned(),
        current.cap(),
    );

    tracing::debug!(
        item_id = %item.id,
        action = %interaction.action,
        before = current.len(),
        after = updated.len(),
        "Preferences updated"
    );

    updated
}
