use chrono::Utc;
use tracing::debug;

use super::cache::EpisodeTotalCache;
use super::episodes::{can_mark_directly, next_unwatched, unwatched_before};
use super::progress::compute_progress;
use super::store::WatchStore;
use crate::model::{Episode, Show, TrackedShow};
use crate::tvmaze::Catalog;

/// Result of a toggle request. `NeedsConfirmation` is the only intermediate
/// state; it is never persisted and is discarded once resolved.
#[derive(Debug, Clone)]
pub(crate) enum ToggleOutcome {
    Watched,
    Unwatched,
    NeedsConfirmation(PendingToggle),
    /// The input did not name a tracked show or one of its episodes.
    Ignored,
}

/// Captured state of a gated mark-watched request: the target episode and
/// the earlier episodes that would be skipped.
#[derive(Debug, Clone)]
pub(crate) struct PendingToggle {
    pub(crate) show_id: u64,
    pub(crate) target: Episode,
    pub(crate) gap: Vec<Episode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipResolution {
    /// Mark every skipped episode plus the target.
    MarkAll,
    /// Mark only the target, leaving the gap unwatched.
    OnlyTarget,
}

/// Single orchestration point for watch-state mutations. Owns the in-memory
/// working copy of the tracked shows and is the only writer path back to
/// the store. Mutations update memory first; persistence failures are
/// logged inside the store and never surface here.
pub(crate) struct Tracker {
    store: WatchStore,
    cache: EpisodeTotalCache,
    shows: Vec<TrackedShow>,
}

impl Tracker {
    pub(crate) fn load(store: WatchStore, cache: EpisodeTotalCache) -> Self {
        let shows = store.get_all();
        Self {
            store,
            cache,
            shows,
        }
    }

    pub(crate) fn shows(&self) -> &[TrackedShow] {
        &self.shows
    }

    pub(crate) fn get(&self, show_id: u64) -> Option<&TrackedShow> {
        self.shows.iter().find(|show| show.id == show_id)
    }

    pub(crate) fn is_tracked(&self, show_id: u64) -> bool {
        self.shows.iter().any(|show| show.id == show_id)
    }

    pub(crate) fn track(&mut self, show: Show) {
        if self.is_tracked(show.id) {
            return;
        }
        let tracked = TrackedShow::new(show, Utc::now());
        self.store.add(tracked.clone());
        self.shows.push(tracked);
    }

    pub(crate) fn untrack(&mut self, show_id: u64) {
        self.store.remove(show_id);
        self.shows.retain(|show| show.id != show_id);
    }

    /// Toggle an episode's watched state. Un-marking never asks for
    /// confirmation; marking an episode with unwatched predecessors returns
    /// `NeedsConfirmation` instead of mutating anything.
    pub(crate) fn toggle_episode(
        &mut self,
        show_id: u64,
        episodes: &[Episode],
        episode_id: u64,
    ) -> ToggleOutcome {
        let Some(tracked) = self.shows.iter().find(|show| show.id == show_id) else {
            return ToggleOutcome::Ignored;
        };
        let Some(target) = episodes.iter().find(|ep| ep.id == episode_id).cloned() else {
            return ToggleOutcome::Ignored;
        };

        if tracked.watched_episodes.contains(&episode_id) {
            self.store.set_episode_unwatched(show_id, episode_id);
            self.apply(show_id, Some(episodes), |show| {
                show.watched_episodes.remove(&episode_id)
            });
            return ToggleOutcome::Unwatched;
        }

        if can_mark_directly(episodes, episode_id, &tracked.watched_episodes) {
            self.mark_watched(show_id, episodes, episode_id);
            return ToggleOutcome::Watched;
        }

        let gap = unwatched_before(episodes, episode_id, &tracked.watched_episodes);
        ToggleOutcome::NeedsConfirmation(PendingToggle {
            show_id,
            target,
            gap,
        })
    }

    /// Resolve a pending skip confirmation. The pending state is consumed
    /// either way.
    pub(crate) fn resolve_pending(
        &mut self,
        pending: PendingToggle,
        resolution: SkipResolution,
        episodes: &[Episode],
    ) {
        match resolution {
            SkipResolution::MarkAll => {
                let mut ids: Vec<u64> = pending.gap.iter().map(|ep| ep.id).collect();
                ids.push(pending.target.id);
                self.store.set_episodes_watched_bulk(pending.show_id, &ids);
                let now = Utc::now();
                self.apply(pending.show_id, Some(episodes), |show| {
                    let mut changed = false;
                    for id in &ids {
                        changed |= show.watched_episodes.insert(*id);
                    }
                    if changed {
                        show.last_watched = Some(now);
                    }
                    changed
                });
            }
            SkipResolution::OnlyTarget => {
                self.mark_watched(pending.show_id, episodes, pending.target.id);
            }
        }
    }

    /// Unconditionally unmark an episode. Works without an episode list;
    /// completion is recomputed from the cached total.
    pub(crate) fn unwatch(&mut self, show_id: u64, episode_id: u64) -> ToggleOutcome {
        if !self.is_tracked(show_id) {
            return ToggleOutcome::Ignored;
        }
        self.store.set_episode_unwatched(show_id, episode_id);
        self.apply(show_id, None, |show| {
            show.watched_episodes.remove(&episode_id)
        });
        ToggleOutcome::Unwatched
    }

    /// Marks the next unwatched episode. The target has no unwatched
    /// predecessors by construction, so this never needs confirmation.
    pub(crate) fn mark_next(&mut self, show_id: u64, episodes: &[Episode]) -> Option<Episode> {
        let tracked = self.shows.iter().find(|show| show.id == show_id)?;
        let next = next_unwatched(episodes, &tracked.watched_episodes)?;
        self.mark_watched(show_id, episodes, next.id);
        Some(next)
    }

    /// Refreshes the cached episode total when it is stale and copies a
    /// successfully fetched total onto the tracked record. Returns the
    /// current total, or `None` when none is known yet or a refresh for
    /// this show is already in flight.
    pub(crate) fn refresh_total(&mut self, show_id: u64, catalog: &dyn Catalog) -> Option<u32> {
        self.get(show_id)?;
        if !self.cache.is_stale(show_id) {
            return self.cache.entry(show_id).map(|entry| entry.total);
        }
        if !self.cache.begin_refresh(show_id) {
            return None;
        }
        // Re-read the lifecycle alongside the list: a show that ended after
        // it was tracked must land in the cache as ended, or its entry would
        // keep expiring forever.
        let status = match catalog.fetch_show(show_id) {
            Ok(fresh) => self.refresh_show_metadata(show_id, fresh),
            Err(err) => {
                debug!("show lookup failed for {show_id}, keeping stored lifecycle: {err:#}");
                self.get(show_id)?.show.status.clone()
            }
        };
        let outcome = catalog
            .fetch_episode_list(show_id)
            .map(|list| list.len() as u32);
        let fetched_ok = outcome.is_ok();
        let total = self.cache.finish_refresh(show_id, &status, outcome)?;
        if fetched_ok {
            // The failure sentinel stays out of the tracked record; only an
            // observed list length may land in total_episodes.
            let now = Utc::now();
            self.apply(show_id, None, |show| {
                show.total_episodes = Some(total);
                show.total_episodes_updated_at = Some(now);
                true
            });
        }
        Some(total)
    }

    /// Replaces the catalog snapshot on the tracked record and returns the
    /// fresh lifecycle string. Bypasses `apply` on purpose: completion must
    /// not be re-derived from a metadata-only update.
    fn refresh_show_metadata(&mut self, show_id: u64, fresh: Show) -> String {
        let status = fresh.status.clone();
        if let Some(show) = self.shows.iter_mut().find(|show| show.id == show_id) {
            show.show = fresh;
            self.store.update(show.clone());
        }
        status
    }

    /// Drops every cached episode total. Tracked records keep their copied
    /// totals until the next refresh overwrites them.
    pub(crate) fn clear_cache(&mut self) {
        self.cache.clear();
    }

    #[cfg(test)]
    pub(crate) fn cache_mut(&mut self) -> &mut EpisodeTotalCache {
        &mut self.cache
    }

    fn mark_watched(&mut self, show_id: u64, episodes: &[Episode], episode_id: u64) {
        self.store.set_episode_watched(show_id, episode_id);
        let now = Utc::now();
        self.apply(show_id, Some(episodes), |show| {
            if show.watched_episodes.insert(episode_id) {
                show.last_watched = Some(now);
                true
            } else {
                false
            }
        });
    }

    /// Mutates the in-memory record; when the closure reports a change,
    /// re-derives completion with whatever total information is at hand and
    /// writes the record through. A no-op mutation leaves both the record
    /// and the store untouched.
    fn apply<F>(&mut self, show_id: u64, episodes: Option<&[Episode]>, mutate: F)
    where
        F: FnOnce(&mut TrackedShow) -> bool,
    {
        let Some(show) = self.shows.iter_mut().find(|show| show.id == show_id) else {
            return;
        };
        if !mutate(show) {
            return;
        }
        show.is_completed = compute_progress(show, episodes).is_completed;
        self.store.update(show.clone());
    }
}
