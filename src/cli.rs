use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tvtrack",
    version,
    about = "Track TV shows and episode watch progress"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Search { query: String },
    Track { show_id: u64 },
    Untrack { show_id: u64 },
    List,
    Episodes { show_id: u64 },
    Watch { show_id: u64, episode_id: u64 },
    Unwatch { show_id: u64, episode_id: u64 },
    Next { show_id: u64 },
    Stats,
    ClearCache,
}
