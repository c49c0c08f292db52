use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Rating {
    pub(crate) average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Network {
    pub(crate) name: String,
}

/// Catalog show as served by TVmaze. Read-only to this tool; extra fields in
/// the API payload are ignored on deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Show {
    pub(crate) id: u64,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) genres: Vec<String>,
    #[serde(default)]
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) premiered: Option<String>,
    #[serde(default)]
    pub(crate) ended: Option<String>,
    #[serde(default)]
    pub(crate) rating: Rating,
    #[serde(default)]
    pub(crate) network: Option<Network>,
}

/// One episode of a show. Identity is `id`; the canonical position is
/// `(season, number)` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Episode {
    pub(crate) id: u64,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) season: u32,
    pub(crate) number: u32,
    #[serde(default)]
    pub(crate) airdate: Option<String>,
    #[serde(default)]
    pub(crate) rating: Rating,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub(crate) score: f64,
    pub(crate) show: Show,
}

/// A show the user follows, with its watched-episode set and the cached
/// episode total. This is the record persisted in the tracked-shows blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackedShow {
    pub(crate) id: u64,
    pub(crate) show: Show,
    pub(crate) added_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) watched_episodes: BTreeSet<u64>,
    #[serde(default)]
    pub(crate) last_watched: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(crate) is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) total_episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) total_episodes_updated_at: Option<DateTime<Utc>>,
}

impl TrackedShow {
    pub(crate) fn new(show: Show, added_at: DateTime<Utc>) -> Self {
        Self {
            id: show.id,
            show,
            added_at,
            watched_episodes: BTreeSet::new(),
            last_watched: None,
            is_completed: false,
            total_episodes: None,
            total_episodes_updated_at: None,
        }
    }
}

/// Layout of the tracked-shows blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreData {
    #[serde(default)]
    pub(crate) tracked_shows: Vec<TrackedShow>,
    pub(crate) last_updated: DateTime<Utc>,
}

impl StoreData {
    pub(crate) fn empty() -> Self {
        Self {
            tracked_shows: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}
