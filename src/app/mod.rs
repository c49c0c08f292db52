mod cache;
mod episodes;
mod progress;
mod store;
mod tracker;


use std::cmp::Ordering;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::cli::{Cli, Command};
use crate::db::{Database, StorageMedium};
use crate::model::{Rating, TrackedShow};
use crate::paths::database_file_path;
use crate::tvmaze::{Catalog, TvMaze};

use self::cache::EpisodeTotalCache;
use self::episodes::order_episodes;
use self::progress::compute_progress;
use self::store::WatchStore;
use self::tracker::{SkipResolution, ToggleOutcome, Tracker};

pub fn run(cli: Cli) -> Result<()> {
    let medium: Rc<dyn StorageMedium> = Rc::new(open_db()?);
    let store = WatchStore::new(Rc::clone(&medium));
    let cache = EpisodeTotalCache::load(Rc::clone(&medium));
    let mut tracker = Tracker::load(store, cache);
    let catalog = TvMaze::new();

    match cli.command {
        Command::Search { query } => run_search(&catalog, &query),
        Command::Track { show_id } => run_track(&mut tracker, &catalog, show_id),
        Command::Untrack { show_id } => run_untrack(&mut tracker, show_id),
        Command::List => run_list(&mut tracker, &catalog),
        Command::Episodes { show_id } => run_episodes(&tracker, &catalog, show_id),
        Command::Watch {
            show_id,
            episode_id,
        } => run_watch(&mut tracker, &catalog, show_id, episode_id),
        Command::Unwatch {
            show_id,
            episode_id,
        } => run_unwatch(&mut tracker, show_id, episode_id),
        Command::Next { show_id } => run_next(&mut tracker, &catalog, show_id),
        Command::Stats => run_stats(&tracker),
        Command::ClearCache => {
            tracker.clear_cache();
            println!("Cleared the episode-count cache.");
            Ok(())
        }
    }
}

fn run_search(catalog: &dyn Catalog, query: &str) -> Result<()> {
    let mut results = match catalog.search_shows(query) {
        Ok(results) => results,
        Err(err) => {
            println!("Search failed: {err:#}");
            return Ok(());
        }
    };
    if results.is_empty() {
        println!("No shows found for \"{query}\".");
        return Ok(());
    }
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    println!(
        "{:<10} {:<40} {:<12} {:<8} {:<12} {}",
        "ID", "NAME", "STATUS", "RATING", "YEARS", "NETWORK"
    );
    for result in results {
        let show = result.show;
        println!(
            "{:<10} {:<40} {:<12} {:<8} {:<12} {}",
            show.id,
            truncate(&show.name, 40),
            truncate(&show.status, 12),
            format_rating(&show.rating),
            format_years(show.premiered.as_deref(), show.ended.as_deref()),
            show.network.map(|network| network.name).unwrap_or_default()
        );
    }
    Ok(())
}

fn run_track(tracker: &mut Tracker, catalog: &dyn Catalog, show_id: u64) -> Result<()> {
    if tracker.is_tracked(show_id) {
        println!("Show {show_id} is already tracked.");
        return Ok(());
    }
    let show = match catalog.fetch_show(show_id) {
        Ok(show) => show,
        Err(err) => {
            println!("Could not load show {show_id}: {err:#}");
            return Ok(());
        }
    };
    let name = show.name.clone();
    tracker.track(show);
    println!("Now tracking: {name}");
    Ok(())
}

fn run_untrack(tracker: &mut Tracker, show_id: u64) -> Result<()> {
    if !tracker.is_tracked(show_id) {
        println!("Show {show_id} is not tracked.");
        return Ok(());
    }
    tracker.untrack(show_id);
    println!("Stopped tracking show {show_id}.");
    Ok(())
}

fn run_list(tracker: &mut Tracker, catalog: &dyn Catalog) -> Result<()> {
    if tracker.shows().is_empty() {
        println!("No tracked shows yet. Run `tvtrack search <query>` to find one.");
        return Ok(());
    }

    let ids: Vec<u64> = tracker.shows().iter().map(|show| show.id).collect();
    for id in ids {
        tracker.refresh_total(id, catalog);
    }

    let mut shows: Vec<TrackedShow> = tracker.shows().to_vec();
    shows.sort_by(|a, b| match (&a.last_watched, &b.last_watched) {
        (Some(left), Some(right)) => right.cmp(left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.show.name.cmp(&b.show.name),
    });

    println!(
        "{:<10} {:<40} {:<14} {:<6} {:<20}",
        "ID", "NAME", "PROGRESS", "DONE", "LAST WATCHED"
    );
    for show in shows {
        let progress = compute_progress(&show, None);
        println!(
            "{:<10} {:<40} {:<14} {:<6} {:<20}",
            show.id,
            truncate(&show.show.name, 40),
            format!(
                "{}/{} ({}%)",
                progress.watched_count, progress.total_episodes, progress.percent
            ),
            if show.is_completed { "yes" } else { "" },
            show.last_watched
                .map(format_timestamp_display)
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn run_episodes(tracker: &Tracker, catalog: &dyn Catalog, show_id: u64) -> Result<()> {
    let episodes = match catalog.fetch_episode_list(show_id) {
        Ok(episodes) => episodes,
        Err(err) => {
            println!("Could not load the episode list: {err:#}");
            return Ok(());
        }
    };
    if episodes.is_empty() {
        println!("Show {show_id} has no episodes listed.");
        return Ok(());
    }

    let tracked = tracker.get(show_id);
    for episode in order_episodes(&episodes) {
        let watched = tracked
            .map(|show| show.watched_episodes.contains(&episode.id))
            .unwrap_or(false);
        println!(
            "[{}] {:<10} S{:02}E{:02}  {}",
            if watched { "x" } else { " " },
            episode.id,
            episode.season,
            episode.number,
            truncate(&episode.name, 50)
        );
    }
    if let Some(tracked) = tracked {
        let progress = compute_progress(tracked, Some(&episodes));
        println!(
            "\nWatched {} of {} ({}%).",
            progress.watched_count, progress.total_episodes, progress.percent
        );
    }
    Ok(())
}

fn run_watch(
    tracker: &mut Tracker,
    catalog: &dyn Catalog,
    show_id: u64,
    episode_id: u64,
) -> Result<()> {
    if !tracker.is_tracked(show_id) {
        println!("Show {show_id} is not tracked. Run `tvtrack track {show_id}` first.");
        return Ok(());
    }
    let episodes = match catalog.fetch_episode_list(show_id) {
        Ok(episodes) => episodes,
        Err(err) => {
            println!("Could not load the episode list: {err:#}");
            return Ok(());
        }
    };

    match tracker.toggle_episode(show_id, &episodes, episode_id) {
        ToggleOutcome::Watched => println!("Marked episode {episode_id} watched."),
        ToggleOutcome::Unwatched => println!("Marked episode {episode_id} unwatched."),
        ToggleOutcome::Ignored => {
            println!("Episode {episode_id} does not belong to show {show_id}.");
        }
        ToggleOutcome::NeedsConfirmation(pending) => {
            println!(
                "Marking this episode would skip {} earlier episode(s):",
                pending.gap.len()
            );
            for episode in &pending.gap {
                println!(
                    "  S{:02}E{:02}  {}",
                    episode.season, episode.number, episode.name
                );
            }
            match prompt_skip_resolution()? {
                Some(resolution) => {
                    tracker.resolve_pending(pending, resolution, &episodes);
                    match resolution {
                        SkipResolution::MarkAll => {
                            println!("Marked the skipped episodes and episode {episode_id}.");
                        }
                        SkipResolution::OnlyTarget => {
                            println!("Marked only episode {episode_id}; earlier gaps remain.");
                        }
                    }
                }
                None => println!("Cancelled; nothing was marked."),
            }
        }
    }
    Ok(())
}

fn run_unwatch(tracker: &mut Tracker, show_id: u64, episode_id: u64) -> Result<()> {
    match tracker.unwatch(show_id, episode_id) {
        ToggleOutcome::Unwatched => println!("Marked episode {episode_id} unwatched."),
        _ => println!("Show {show_id} is not tracked."),
    }
    Ok(())
}

fn run_next(tracker: &mut Tracker, catalog: &dyn Catalog, show_id: u64) -> Result<()> {
    if !tracker.is_tracked(show_id) {
        println!("Show {show_id} is not tracked. Run `tvtrack track {show_id}` first.");
        return Ok(());
    }
    let episodes = match catalog.fetch_episode_list(show_id) {
        Ok(episodes) => episodes,
        Err(err) => {
            println!("Could not load the episode list: {err:#}");
            return Ok(());
        }
    };

    match tracker.mark_next(show_id, &episodes) {
        Some(episode) => {
            println!(
                "Marked S{:02}E{:02} \"{}\" watched.",
                episode.season, episode.number, episode.name
            );
            if let Some(tracked) = tracker.get(show_id) {
                let progress = compute_progress(tracked, Some(&episodes));
                if progress.is_completed {
                    println!("That was the last one. Show complete!");
                } else {
                    println!(
                        "Watched {} of {} ({}%).",
                        progress.watched_count, progress.total_episodes, progress.percent
                    );
                }
            }
        }
        None => println!("All caught up; no unwatched episodes left."),
    }
    Ok(())
}

fn run_stats(tracker: &Tracker) -> Result<()> {
    let shows = tracker.shows();
    if shows.is_empty() {
        println!("No tracked shows yet.");
        return Ok(());
    }

    let total_shows = shows.len();
    let completed: usize = shows.iter().filter(|show| show.is_completed).count();
    let watched_episodes: usize = shows.iter().map(|show| show.watched_episodes.len()).sum();

    // Rough watch-time estimate at 45 minutes per episode.
    let total_minutes = watched_episodes * 45;
    let total_hours = total_minutes / 60;

    println!("Tracked shows:    {total_shows}");
    println!("Completed:        {completed}");
    println!("Active:           {}", total_shows - completed);
    println!("Episodes watched: {watched_episodes}");
    println!("Time watched:     ~{total_hours}h ({total_minutes} min)");

    let mut genre_counts: Vec<(String, usize)> = Vec::new();
    for show in shows {
        for genre in &show.show.genres {
            match genre_counts.iter_mut().find(|(name, _)| name == genre) {
                Some((_, count)) => *count += 1,
                None => genre_counts.push((genre.clone(), 1)),
            }
        }
    }
    genre_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if !genre_counts.is_empty() {
        println!("Top genres:");
        for (genre, count) in genre_counts.iter().take(5) {
            println!("  {genre:<20} {count}");
        }
    }
    Ok(())
}

fn prompt_skip_resolution() -> Result<Option<SkipResolution>> {
    print!("Mark [a]ll skipped episodes, [o]nly this one, or [c]ancel? ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(match line.trim().to_lowercase().as_str() {
        "a" | "all" => Some(SkipResolution::MarkAll),
        "o" | "one" | "only" => Some(SkipResolution::OnlyTarget),
        _ => None,
    })
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}

fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

fn format_years(premiered: Option<&str>, ended: Option<&str>) -> String {
    let year = |date: &str| date.get(..4).unwrap_or(date).to_string();
    match (premiered, ended) {
        (Some(from), Some(to)) => format!("{}-{}", year(from), year(to)),
        (Some(from), None) => format!("{}-", year(from)),
        (None, _) => "-".to_string(),
    }
}

fn format_rating(rating: &Rating) -> String {
    rating
        .average
        .map(|avg| format!("{avg:.1}"))
        .unwrap_or_else(|| "-".to_string())
}

fn format_timestamp_display(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
