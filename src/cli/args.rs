use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// unisound - search SoundCloud and YouTube at once
///
/// One keyword goes to every backend; results come back as a single
/// list and any of them can be resolved and played through mpv.
#[derive(Parser, Debug)]
#[command(name = "unisound")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Config file (defaults to $UNISOUND_CONFIG or .unisound/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search every backend and list the merged results
    Search {
        /// Search keyword
        keyword: String,
        /// Pages to fetch from each backend
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Print the stream URL of one search result
    Resolve {
        /// Search keyword
        keyword: String,
        /// Result number as printed by `search`
        #[arg(short, long)]
        index: usize,
    },
    /// Play one search result through mpv
    Play {
        /// Search keyword
        keyword: String,
        /// Result number as printed by `search`
        #[arg(short, long, default_value_t = 1)]
        index: usize,
    },
}
