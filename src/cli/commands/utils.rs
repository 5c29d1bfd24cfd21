use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use unisound::provider::{
    Paginator, SoundcloudProvider, SoundcloudSource, YoutubeProvider, YoutubeSource,
};
use unisound::state::{Config, CredentialCell};
use unisound::{SearchAggregator, SearchSource, Snippet};

/// `--config`, then `$UNISOUND_CONFIG`, then `.unisound/config.toml`
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::var("UNISOUND_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Config::default().config_path()),
    };
    Config::load_or_default(&path)
}

pub struct Sources {
    pub soundcloud: Arc<SoundcloudSource>,
    pub youtube: Arc<YoutubeSource>,
}

impl Sources {
    pub fn new(config: &Config) -> Result<Self> {
        let http = config.http_client()?;
        let client_id = Arc::new(CredentialCell::new());

        Ok(Self {
            soundcloud: Arc::new(Paginator::new(SoundcloudProvider::with_credential(
                http.clone(),
                config,
                client_id,
            ))),
            youtube: Arc::new(Paginator::new(YoutubeProvider::new(http, config))),
        })
    }

    /// Registry order: SoundCloud first, then YouTube
    pub fn all(&self) -> Vec<Arc<dyn SearchSource>> {
        let soundcloud: Arc<dyn SearchSource> = self.soundcloud.clone();
        let youtube: Arc<dyn SearchSource> = self.youtube.clone();
        vec![soundcloud, youtube]
    }
}

/// Fetch `pages` pages from every source and return the merged list
pub async fn search_merged(
    aggregator: &SearchAggregator,
    keyword: &str,
    pages: usize,
    config: &Config,
) -> Result<Vec<Snippet>> {
    aggregator.search_all(keyword);
    let mut merged = wait_idle(aggregator, config).await?;

    for _ in 1..pages {
        if aggregator.search_all_next() == 0 {
            break;
        }
        merged = wait_idle(aggregator, config).await?;
    }

    for (kind, err) in aggregator.errors() {
        eprintln!("warning: {} search failed: {}", kind, err);
    }
    Ok(merged)
}

async fn wait_idle(aggregator: &SearchAggregator, config: &Config) -> Result<Vec<Snippet>> {
    match aggregator
        .await_all_idle_timeout(config.search_timeout())
        .await
    {
        Some(merged) => Ok(merged),
        None => {
            aggregator.cancel_all();
            bail!(
                "Search timed out after {}s",
                config.search_timeout().as_secs()
            )
        }
    }
}

/// 1-based lookup into a printed result list
pub fn pick(results: &[Snippet], index: usize) -> Result<&Snippet> {
    index
        .checked_sub(1)
        .and_then(|i| results.get(i))
        .with_context(|| format!("No result #{} ({} results)", index, results.len()))
}
