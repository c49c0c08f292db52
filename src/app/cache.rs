use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db::StorageMedium;

pub(crate) const EPISODE_COUNT_CACHE_KEY: &str = "episode-count-cache";

const REFRESH_WINDOW_HOURS: i64 = 12;
const ENDED_STATUS: &str = "ended";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CacheEntry {
    pub(crate) total: u32,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) status: String,
}

/// Per-show episode-total cache, persisted as a side-table blob distinct
/// from the watch-state store. Avoids refetching a full episode list just
/// to learn its length.
///
/// Entries for shows whose lifecycle snapshot is "ended" never go stale;
/// everything else expires after the refresh window. At most one refresh
/// per show id may be in flight; a second request for the same id while one
/// is pending is dropped, not queued.
pub(crate) struct EpisodeTotalCache {
    medium: Rc<dyn StorageMedium>,
    entries: HashMap<u64, CacheEntry>,
    in_flight: HashSet<u64>,
    cancelled: bool,
}

impl EpisodeTotalCache {
    pub(crate) fn load(medium: Rc<dyn StorageMedium>) -> Self {
        let entries = match medium.read_blob(EPISODE_COUNT_CACHE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("discarding corrupt episode-count cache: {err}");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(err) => {
                warn!("failed to read episode-count cache: {err:#}");
                HashMap::new()
            }
        };
        Self {
            medium,
            entries,
            in_flight: HashSet::new(),
            cancelled: false,
        }
    }

    pub(crate) fn entry(&self, show_id: u64) -> Option<&CacheEntry> {
        self.entries.get(&show_id)
    }

    /// An absent entry counts as stale.
    pub(crate) fn is_stale(&self, show_id: u64) -> bool {
        let Some(entry) = self.entries.get(&show_id) else {
            return true;
        };
        if entry.status.eq_ignore_ascii_case(ENDED_STATUS) {
            return false;
        }
        Utc::now() - entry.updated_at > Duration::hours(REFRESH_WINDOW_HOURS)
    }

    /// Claims the in-flight marker for a show id. Returns false when a
    /// refresh is already pending; the caller must then skip its fetch.
    pub(crate) fn begin_refresh(&mut self, show_id: u64) -> bool {
        if self.in_flight.is_empty() {
            // A cancellation covers only the refreshes that were pending
            // when it was issued; a fresh cycle starts clean.
            self.cancelled = false;
        }
        self.in_flight.insert(show_id)
    }

    /// Commits a fetch outcome and releases the in-flight marker. A fetch
    /// failure is recorded as the `total = 0` sentinel so the entry exists
    /// but expires with the normal window; there is no automatic retry.
    /// Returns the committed total, or `None` when the result arrived after
    /// cancellation and was discarded.
    pub(crate) fn finish_refresh(
        &mut self,
        show_id: u64,
        status: &str,
        outcome: Result<u32>,
    ) -> Option<u32> {
        self.in_flight.remove(&show_id);
        if self.cancelled {
            return None;
        }
        let total = match outcome {
            Ok(total) => total,
            Err(err) => {
                warn!("episode list fetch failed for show {show_id}: {err:#}");
                0
            }
        };
        self.entries.insert(
            show_id,
            CacheEntry {
                total,
                updated_at: Utc::now(),
                status: status.to_string(),
            },
        );
        self.persist();
        Some(total)
    }

    /// Suppresses the effect of any refresh still in flight. The fetch
    /// itself is not aborted; its result is dropped on arrival. Starting a
    /// new refresh cycle lifts the suppression.
    pub(crate) fn cancel_pending(&mut self) {
        self.cancelled = true;
    }

    /// Full-cache clear; entries are never deleted individually.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    fn persist(&self) {
        match serde_json::to_string(&self.entries) {
            Ok(raw) => {
                if let Err(err) = self.medium.write_blob(EPISODE_COUNT_CACHE_KEY, &raw) {
                    warn!("failed to persist episode-count cache: {err:#}");
                }
            }
            Err(err) => warn!("failed to serialize episode-count cache: {err}"),
        }
    }
}
