use std::collections::BTreeSet;

use crate::model::Episode;

/// Canonical order: season ascending, then number ascending. The sort is
/// stable, so (invalid) duplicate positions keep their input order.
pub(crate) fn order_episodes(episodes: &[Episode]) -> Vec<Episode> {
    let mut ordered = episodes.to_vec();
    ordered.sort_by_key(|episode| (episode.season, episode.number));
    ordered
}

/// Every episode canonically before the target that is not yet watched.
/// An unknown target id yields an empty list rather than an error.
pub(crate) fn unwatched_before(
    episodes: &[Episode],
    target_id: u64,
    watched: &BTreeSet<u64>,
) -> Vec<Episode> {
    let ordered = order_episodes(episodes);
    let Some(target_idx) = ordered.iter().position(|episode| episode.id == target_id) else {
        return Vec::new();
    };
    ordered[..target_idx]
        .iter()
        .filter(|episode| !watched.contains(&episode.id))
        .cloned()
        .collect()
}

/// Gating check for skip confirmation: true iff nothing before the target
/// is still unwatched.
pub(crate) fn can_mark_directly(
    episodes: &[Episode],
    target_id: u64,
    watched: &BTreeSet<u64>,
) -> bool {
    unwatched_before(episodes, target_id, watched).is_empty()
}

/// First episode in canonical order that is not watched yet.
pub(crate) fn next_unwatched(episodes: &[Episode], watched: &BTreeSet<u64>) -> Option<Episode> {
    order_episodes(episodes)
        .into_iter()
        .find(|episode| !watched.contains(&episode.id))
}
