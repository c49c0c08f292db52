use std::rc::Rc;

use chrono::Utc;
use tracing::warn;

use crate::db::StorageMedium;
use crate::model::{StoreData, TrackedShow};

pub(crate) const TRACKED_SHOWS_KEY: &str = "tracked-shows";

/// Durable CRUD over the tracked-shows blob, keyed by show id. Every
/// operation is a read-modify-write against the storage medium; persistence
/// failures are logged and the operation degrades to a no-op rather than
/// propagating.
pub(crate) struct WatchStore {
    medium: Rc<dyn StorageMedium>,
}

impl WatchStore {
    pub(crate) fn new(medium: Rc<dyn StorageMedium>) -> Self {
        Self { medium }
    }

    fn load(&self) -> StoreData {
        match self.medium.read_blob(TRACKED_SHOWS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(data) => data,
                Err(err) => {
                    warn!("discarding corrupt tracked-shows blob: {err}");
                    StoreData::empty()
                }
            },
            Ok(None) => StoreData::empty(),
            Err(err) => {
                warn!("failed to read tracked-shows blob: {err:#}");
                StoreData::empty()
            }
        }
    }

    fn save(&self, mut data: StoreData) {
        data.last_updated = Utc::now();
        match serde_json::to_string(&data) {
            Ok(raw) => {
                if let Err(err) = self.medium.write_blob(TRACKED_SHOWS_KEY, &raw) {
                    warn!("failed to persist tracked shows: {err:#}");
                }
            }
            Err(err) => warn!("failed to serialize tracked shows: {err}"),
        }
    }

    pub(crate) fn get_all(&self) -> Vec<TrackedShow> {
        self.load().tracked_shows
    }

    /// Silent no-op when a record with the same id already exists.
    pub(crate) fn add(&self, tracked: TrackedShow) {
        let mut data = self.load();
        if data.tracked_shows.iter().any(|show| show.id == tracked.id) {
            return;
        }
        data.tracked_shows.push(tracked);
        self.save(data);
    }

    pub(crate) fn remove(&self, show_id: u64) {
        let mut data = self.load();
        let before = data.tracked_shows.len();
        data.tracked_shows.retain(|show| show.id != show_id);
        if data.tracked_shows.len() != before {
            self.save(data);
        }
    }

    /// Replaces the matching record in place; no-op when the id is unknown
    /// (callers must ensure the show exists before updating).
    pub(crate) fn update(&self, updated: TrackedShow) {
        let mut data = self.load();
        let Some(slot) = data
            .tracked_shows
            .iter_mut()
            .find(|show| show.id == updated.id)
        else {
            return;
        };
        *slot = updated;
        self.save(data);
    }

    /// Idempotent: stamps `last_watched` only when the id was actually added.
    pub(crate) fn set_episode_watched(&self, show_id: u64, episode_id: u64) {
        let mut data = self.load();
        let Some(show) = data.tracked_shows.iter_mut().find(|show| show.id == show_id) else {
            return;
        };
        if show.watched_episodes.insert(episode_id) {
            show.last_watched = Some(Utc::now());
            self.save(data);
        }
    }

    /// Idempotent; never touches `last_watched`.
    pub(crate) fn set_episode_unwatched(&self, show_id: u64, episode_id: u64) {
        let mut data = self.load();
        let Some(show) = data.tracked_shows.iter_mut().find(|show| show.id == show_id) else {
            return;
        };
        if show.watched_episodes.remove(&episode_id) {
            self.save(data);
        }
    }

    /// Idempotent union; stamps `last_watched` once no matter how many ids
    /// actually changed.
    pub(crate) fn set_episodes_watched_bulk(&self, show_id: u64, episode_ids: &[u64]) {
        let mut data = self.load();
        let Some(show) = data.tracked_shows.iter_mut().find(|show| show.id == show_id) else {
            return;
        };
        let mut changed = false;
        for episode_id in episode_ids {
            changed |= show.watched_episodes.insert(*episode_id);
        }
        if changed {
            show.last_watched = Some(Utc::now());
            self.save(data);
        }
    }

    pub(crate) fn is_episode_watched(&self, show_id: u64, episode_id: u64) -> bool {
        self.load()
            .tracked_shows
            .iter()
            .find(|show| show.id == show_id)
            .is_some_and(|show| show.watched_episodes.contains(&episode_id))
    }

    pub(crate) fn is_show_tracked(&self, show_id: u64) -> bool {
        self.load()
            .tracked_shows
            .iter()
            .any(|show| show.id == show_id)
    }
}
