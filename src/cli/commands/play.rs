use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use unisound::playback::{MpvPlayer, PlaybackResolver};
use unisound::state::Config;
use unisound::utils::format_time;
use unisound::SearchAggregator;

use super::utils::{pick, search_merged, Sources};

const HELP: &str = "[p] pause  [r] resume  [s <secs>] seek  [0] replay  [t] time  [q] quit";

pub async fn run(keyword: &str, index: usize, config: &Config) -> Result<()> {
    let sources = Sources::new(config)?;
    let aggregator = SearchAggregator::new(sources.all());
    let results = search_merged(&aggregator, keyword, 1, config).await?;
    let snippet = pick(&results, index)?.clone();

    let player = MpvPlayer::spawn(&config.playback.mpv_path).await?;
    let mut resolver = PlaybackResolver::new(Box::new(player));
    for source in sources.all() {
        resolver.register(source);
    }
    let resolver = Arc::new(resolver);

    println!("Loading {} ...", snippet);
    resolver
        .spawn_play(snippet.clone())
        .await
        .context("Playback task panicked")??;
    println!("Now playing: {} [{}]", snippet, snippet.provider());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let result = match line.split_once(' ') {
            Some(("s", secs)) => match secs.trim().parse::<f64>() {
                Ok(secs) => resolver.seek(secs).await,
                Err(_) => {
                    println!("Usage: s <seconds>");
                    continue;
                }
            },
            _ => match line {
                "p" => resolver.pause().await,
                "r" => resolver.resume().await,
                "0" => resolver.replay().await,
                "t" => {
                    let position = resolver.position().await?.unwrap_or(0.0);
                    let duration = resolver.duration().await?.unwrap_or(0.0);
                    println!("{} / {}", format_time(position), format_time(duration));
                    Ok(())
                }
                "q" => break,
                "" => continue,
                _ => {
                    println!("{}", HELP);
                    Ok(())
                }
            },
        };

        if let Err(e) = result {
            eprintln!("error: {}", e);
        }
    }

    resolver.stop().await?;
    Ok(())
}
