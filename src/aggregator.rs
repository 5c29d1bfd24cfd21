use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, SourceError};
use crate::provider::{ProviderKind, SearchSource, Snippet};

/// Fans one keyword out to a fixed set of sources and merges what they
/// return. Sources run independently; one failing never stops the others.
pub struct SearchAggregator {
    sources: Vec<Arc<dyn SearchSource>>,
}

impl SearchAggregator {
    pub fn new(sources: Vec<Arc<dyn SearchSource>>) -> Self {
        Self { sources }
    }

    /// The registered source that produced `snippet`
    pub fn source_for(&self, snippet: &Snippet) -> Result<Arc<dyn SearchSource>> {
        let kind = snippet.provider();
        self.sources
            .iter()
            .find(|source| source.kind() == kind)
            .cloned()
            .ok_or_else(|| {
                SourceError::UnsupportedSnippet(format!(
                    "no {} source registered for {:?}",
                    kind,
                    snippet.title()
                ))
            })
    }

    /// Start a fresh search on every source. Returns how many accepted it.
    pub fn search_all(&self, keyword: &str) -> usize {
        info!(keyword, sources = self.sources.len(), "searching all sources");
        self.sources
            .iter()
            .filter(|source| source.search_from_start(keyword).is_some())
            .count()
    }

    /// Request the next page from every source. Returns how many accepted it.
    pub fn search_all_next(&self) -> usize {
        self.sources
            .iter()
            .filter(|source| source.search_next().is_some())
            .count()
    }

    pub fn is_busy(&self) -> bool {
        self.sources.iter().any(|source| source.is_busy())
    }

    /// Wait until no source is fetching, then return the merged results.
    pub async fn await_all_idle(&self) -> Vec<Snippet> {
        loop {
            for source in &self.sources {
                let mut idle = source.idle_signal();
                if idle.wait_for(|busy| !*busy).await.is_err() {
                    warn!(kind = %source.kind(), "source dropped its busy signal");
                }
            }
            // a source may have been restarted while we waited on a later one
            if !self.is_busy() {
                break;
            }
            debug!("a source became busy again, waiting another round");
        }
        self.merged()
    }

    /// `await_all_idle` bounded by `limit`; `None` if some source is still
    /// fetching when it runs out.
    pub async fn await_all_idle_timeout(&self, limit: Duration) -> Option<Vec<Snippet>> {
        match tokio::time::timeout(limit, self.await_all_idle()).await {
            Ok(merged) => Some(merged),
            Err(_) => {
                warn!(secs = limit.as_secs(), "sources still busy after timeout");
                None
            }
        }
    }

    /// Every source's results concatenated in registration order.
    pub fn merged(&self) -> Vec<Snippet> {
        self.sources
            .iter()
            .flat_map(|source| source.results())
            .collect()
    }

    /// Failure message of each source whose last page failed
    pub fn errors(&self) -> Vec<(ProviderKind, String)> {
        self.sources
            .iter()
            .filter_map(|source| source.last_error().map(|err| (source.kind(), err)))
            .collect()
    }

    pub fn cancel_all(&self) {
        for source in self.sources.iter().filter(|source| source.is_busy()) {
            source.cancel();
        }
    }
}
