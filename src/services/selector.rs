use std::collections::HashSet;

use rand::seq::SliceRandom;

use crate::{models::MediaItem, services::quota::QuotaStore};

/// Picks a uniformly random subset of `candidates` that respects the daily quota
///
/// Items already shown today are skipped, the result is capped by `count` and by the
/// remaining quota, and each returned item is registered with the quota exactly once.
/// Without persistent storage the candidates are only shuffled and truncated.
pub async fn select(
    candidates: Vec<MediaItem>,
    count: usize,
    quota: &dyn QuotaStore,
) -> Vec<MediaItem> {
    let candidates = dedup_by_id(candidates);

    if !quota.is_persistent() {
        return shuffle_take(candidates, count);
    }

    let records = match quota.today().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "Quota unavailable, selecting without it");
            return shuffle_take(candidates, count);
        }
    };

    let shown: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let filtered: Vec<MediaItem> = candidates
        .into_iter()
        .filter(|item| !shown.contains(item.id.as_str()))
        .collect();

    let remaining = quota.limit().saturating_sub(records.len());
    let effective = count.min(remaining).min(filtered.len());

    tracing::debug!(
        available = filtered.len(),
        remaining = remaining,
        requested = count,
        effective = effective,
        "Selecting recommendations"
    );

    if effective == 0 {
        return Vec::new();
    }

    let chosen = shuffle_take(filtered, effective);

    let mut picked = Vec::with_capacity(chosen.len());
    for item in chosen {
        match quota.try_add(&item.id).await {
            Ok(true) => picked.push(item),
            Ok(false) => {
                tracing::debug!(id = %item.id, "Quota filled during selection, dropping item");
            }
            Err(e) => {
                tracing::warn!(error = %e, id = %item.id, "Failed to register pick");
                picked.push(item);
            }
        }
    }

    picked
}

fn shuffle_take(mut items: Vec<MediaItem>, count: usize) -> Vec<MediaItem> {
    items.shuffle(&mut rand::thread_rng());
    items.truncate(count);
    items
}

fn dedup_by_id(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
