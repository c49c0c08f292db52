use crate::model::{Episode, TrackedShow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShowProgress {
    pub(crate) total_episodes: u32,
    pub(crate) watched_count: u32,
    pub(crate) percent: u32,
    pub(crate) is_completed: bool,
}

/// Derives progress from the tracked record. A supplied episode list is
/// authoritative for the total; otherwise the cached total is used, else 0.
/// Recomputed on demand, never stored as ground truth.
pub(crate) fn compute_progress(
    tracked: &TrackedShow,
    episodes: Option<&[Episode]>,
) -> ShowProgress {
    let watched_count = tracked.watched_episodes.len() as u32;
    let total_episodes = match episodes {
        Some(list) => list.len() as u32,
        None => tracked.total_episodes.unwrap_or(0),
    };
    let percent = if total_episodes == 0 {
        0
    } else {
        // Not clamped: a stale cached total can push this past 100.
        (f64::from(watched_count) / f64::from(total_episodes) * 100.0).round() as u32
    };
    let is_completed = total_episodes > 0 && watched_count >= total_episodes;

    ShowProgress {
        total_episodes,
        watched_count,
        percent,
        is_completed,
    }
}
