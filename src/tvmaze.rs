use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::http;
use crate::model::{Episode, SearchResult, Show};

const BASE_URL: &str = "https://api.tvmaze.com";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote episode/show catalog. The cache and coordinator are handed this as
/// a trait object so tests can stub the network away.
pub(crate) trait Catalog {
    fn fetch_show(&self, show_id: u64) -> Result<Show>;
    fn fetch_episode_list(&self, show_id: u64) -> Result<Vec<Episode>>;
    fn search_shows(&self, query: &str) -> Result<Vec<SearchResult>>;
}

pub(crate) struct TvMaze {
    base_url: String,
}

impl TvMaze {
    pub(crate) fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub(crate) fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn get(&self, path: &str, query: &[(String, String)]) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        http::get_text(&url, query, CONNECT_TIMEOUT, READ_TIMEOUT).map_err(|err| anyhow!(err))
    }
}

impl Catalog for TvMaze {
    fn fetch_show(&self, show_id: u64) -> Result<Show> {
        let raw = self.get(&format!("/shows/{show_id}"), &[])?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse show {show_id}"))
    }

    fn fetch_episode_list(&self, show_id: u64) -> Result<Vec<Episode>> {
        let raw = self.get(&format!("/shows/{show_id}/episodes"), &[])?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse episode list for show {show_id}"))
    }

    fn search_shows(&self, query: &str) -> Result<Vec<SearchResult>> {
        let params = vec![("q".to_string(), query.to_string())];
        let raw = self.get("/search/shows", &params)?;
        serde_json::from_str(&raw).context("failed to parse search results")
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Episode, SearchResult, Show};

    #[test]
    fn parses_show_payload_and_ignores_extra_fields() {
        let raw = r#"{
            "id": 82,
            "url": "https://www.tvmaze.com/shows/82/game-of-thrones",
            "name": "Game of Thrones",
            "genres": ["Drama", "Adventure"],
            "status": "Ended",
            "premiered": "2011-04-17",
            "ended": "2019-05-19",
            "rating": {"average": 8.9},
            "network": {"id": 8, "name": "HBO", "country": {"code": "US"}},
            "externals": {"imdb": "tt0944947"}
        }"#;

        let show: Show = serde_json::from_str(raw).expect("show should parse");
        assert_eq!(show.id, 82);
        assert_eq!(show.status, "Ended");
        assert_eq!(show.genres.len(), 2);
        assert_eq!(show.rating.average, Some(8.9));
        assert_eq!(show.network.map(|n| n.name).as_deref(), Some("HBO"));
    }

    #[test]
    fn parses_episode_list_with_null_optionals() {
        let raw = r#"[
            {"id": 1, "name": "Pilot", "season": 1, "number": 1,
             "airdate": "2011-04-17", "rating": {"average": null}},
            {"id": 2, "name": "", "season": 1, "number": 2,
             "airdate": null, "rating": {"average": 7.8}}
        ]"#;

        let episodes: Vec<Episode> = serde_json::from_str(raw).expect("episodes should parse");
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].season, 1);
        assert_eq!(episodes[1].airdate, None);
        assert_eq!(episodes[1].rating.average, Some(7.8));
    }

    #[test]
    fn parses_search_results() {
        let raw = r#"[
            {"score": 0.91, "show": {"id": 7, "name": "Homecoming", "status": "Running",
             "genres": [], "rating": {"average": null}}}
        ]"#;

        let results: Vec<SearchResult> = serde_json::from_str(raw).expect("results should parse");
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.9);
        assert_eq!(results[0].show.id, 7);
    }
}
