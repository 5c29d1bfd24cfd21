use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SourceError};
use crate::playback::PlaybackSink;
use crate::provider::{ProviderKind, SearchSource, Snippet};

/// What the sink is currently playing.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    snippet: Snippet,
    url: String,
}

impl PlaybackSession {
    pub fn snippet(&self) -> &Snippet {
        &self.snippet
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

struct Deck {
    sink: Box<dyn PlaybackSink>,
    current: Option<PlaybackSession>,
}

/// Turns snippets into audio on a single sink.
///
/// Only one session exists at a time. Starting a new one stops the previous
/// stream first, and a resolution overtaken by a newer `resolve_and_play`
/// never reaches the sink.
pub struct PlaybackResolver {
    sources: HashMap<ProviderKind, Arc<dyn SearchSource>>,
    deck: Mutex<Deck>,
    latest: AtomicU64,
}

impl PlaybackResolver {
    pub fn new(sink: Box<dyn PlaybackSink>) -> Self {
        Self {
            sources: HashMap::new(),
            deck: Mutex::new(Deck {
                sink,
                current: None,
            }),
            latest: AtomicU64::new(0),
        }
    }

    /// Route snippets of `source.kind()` to `source`, replacing any earlier one
    pub fn register(&mut self, source: Arc<dyn SearchSource>) {
        self.sources.insert(source.kind(), source);
    }

    pub fn adapter_for(&self, snippet: &Snippet) -> Result<Arc<dyn SearchSource>> {
        let kind = snippet.provider();
        self.sources.get(&kind).cloned().ok_or_else(|| {
            SourceError::UnsupportedSnippet(format!(
                "no {} source registered for {:?}",
                kind,
                snippet.title()
            ))
        })
    }

    /// Resolve `snippet` and start it on the sink. Returns the stream URL.
    pub async fn resolve_and_play(&self, snippet: &Snippet) -> Result<String> {
        let source = self.adapter_for(snippet)?;
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(kind = %source.kind(), title = snippet.title(), "resolving");
        let url = match source.resolve_playable_url(snippet).await {
            Ok(url) => url,
            Err(err) => {
                error!(title = snippet.title(), error = %err, "resolution failed");
                return Err(err);
            }
        };

        let mut deck = self.deck.lock().await;
        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(title = snippet.title(), "superseded before playback started");
            return Err(SourceError::Cancelled);
        }

        if let Some(previous) = deck.current.take() {
            debug!(title = previous.snippet.title(), "stopping previous session");
            deck.sink.stop().await?;
        }
        deck.sink.load(&url).await?;
        deck.sink.wait_ready().await?;

        info!(title = snippet.title(), "now playing");
        deck.current = Some(PlaybackSession {
            snippet: snippet.clone(),
            url: url.clone(),
        });
        Ok(url)
    }

    /// `resolve_and_play` on a background task
    pub fn spawn_play(self: &Arc<Self>, snippet: Snippet) -> JoinHandle<Result<String>> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move { resolver.resolve_and_play(&snippet).await })
    }

    pub async fn now_playing(&self) -> Option<PlaybackSession> {
        self.deck.lock().await.current.clone()
    }

    pub async fn pause(&self) -> Result<()> {
        let mut deck = self.active_deck("pause").await;
        match deck.as_mut() {
            Some(deck) => Ok(deck.sink.pause().await?),
            None => Ok(()),
        }
    }

    pub async fn resume(&self) -> Result<()> {
        let mut deck = self.active_deck("resume").await;
        match deck.as_mut() {
            Some(deck) => Ok(deck.sink.resume().await?),
            None => Ok(()),
        }
    }

    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let mut deck = self.active_deck("seek").await;
        match deck.as_mut() {
            Some(deck) => Ok(deck.sink.seek(seconds.max(0.0)).await?),
            None => Ok(()),
        }
    }

    /// Back to the start of the current stream and keep playing
    pub async fn replay(&self) -> Result<()> {
        let mut deck = self.active_deck("replay").await;
        if let Some(deck) = deck.as_mut() {
            deck.sink.seek(0.0).await?;
            deck.sink.resume().await?;
        }
        Ok(())
    }

    /// Tear down the current session, if any
    pub async fn stop(&self) -> Result<()> {
        // a resolution still in flight must not start after an explicit stop
        self.latest.fetch_add(1, Ordering::SeqCst);
        let mut deck = self.deck.lock().await;
        if deck.current.take().is_some() {
            deck.sink.stop().await?;
        }
        Ok(())
    }

    pub async fn position(&self) -> Result<Option<f64>> {
        let mut deck = self.deck.lock().await;
        if deck.current.is_none() {
            return Ok(None);
        }
        Ok(deck.sink.position().await?)
    }

    pub async fn duration(&self) -> Result<Option<f64>> {
        let mut deck = self.deck.lock().await;
        if deck.current.is_none() {
            return Ok(None);
        }
        Ok(deck.sink.duration().await?)
    }

    async fn active_deck(&self, action: &str) -> Option<tokio::sync::MutexGuard<'_, Deck>> {
        let deck = self.deck.lock().await;
        if deck.current.is_none() {
            warn!(action, "nothing is playing");
            return None;
        }
        Some(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Backend, Page, Paginator, SnippetPayload};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Arc<StdMutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaybackSink for RecordingSink {
        async fn load(&mut self, url: &str) -> anyhow::Result<()> {
            self.record(format!("load {}", url));
            Ok(())
        }

        async fn pause(&mut self) -> anyhow::Result<()> {
            self.record("pause".to_string());
            Ok(())
        }

        async fn resume(&mut self) -> anyhow::Result<()> {
            self.record("resume".to_string());
            Ok(())
        }

        async fn seek(&mut self, seconds: f64) -> anyhow::Result<()> {
            self.record(format!("seek {}", seconds));
            Ok(())
        }

        async fn stop(&mut self) -> anyhow::Result<()> {
            self.record("stop".to_string());
            Ok(())
        }

        async fn position(&mut self) -> anyhow::Result<Option<f64>> {
            Ok(Some(42.0))
        }

        async fn duration(&mut self) -> anyhow::Result<Option<f64>> {
            Ok(Some(180.0))
        }
    }

    /// Resolves every snippet to `stream://<title>`; a title of "slow"
    /// waits for the gate first.
    struct EchoBackend {
        kind: ProviderKind,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Backend for EchoBackend {
        type Cursor = u32;

        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn fetch_page(&self, _keyword: &str, cursor: &u32) -> Result<Page<u32>> {
            Ok(Page {
                snippets: Vec::new(),
                next: *cursor,
            })
        }

        async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String> {
            if snippet.title() == "slow" {
                self.gate.notified().await;
            }
            Ok(format!("stream://{}", snippet.title()))
        }
    }

    fn video(title: &str) -> Snippet {
        Snippet::new(
            title,
            None,
            None,
            "",
            SnippetPayload::Youtube {
                video_id: title.to_string(),
            },
        )
    }

    fn track(title: &str) -> Snippet {
        Snippet::new(
            title,
            None,
            None,
            "",
            SnippetPayload::Soundcloud {
                track_url: format!("https://api/{}", title),
                track_authorization: "auth".to_string(),
            },
        )
    }

    fn youtube_resolver(sink: RecordingSink) -> (PlaybackResolver, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut resolver = PlaybackResolver::new(Box::new(sink));
        resolver.register(Arc::new(Paginator::new(EchoBackend {
            kind: ProviderKind::Youtube,
            gate: Arc::clone(&gate),
        })));
        (resolver, gate)
    }

    #[tokio::test]
    async fn test_unregistered_variant_never_reaches_sink() {
        let sink = RecordingSink::default();
        let (resolver, _gate) = youtube_resolver(sink.clone());

        let err = resolver.resolve_and_play(&track("a")).await.unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedSnippet(_)));
        assert!(sink.calls().is_empty());
        assert!(resolver.now_playing().await.is_none());
    }

    #[tokio::test]
    async fn test_new_play_stops_previous_session() {
        let sink = RecordingSink::default();
        let (resolver, _gate) = youtube_resolver(sink.clone());

        resolver.resolve_and_play(&video("a")).await.unwrap();
        let url = resolver.resolve_and_play(&video("b")).await.unwrap();

        assert_eq!(url, "stream://b");
        assert_eq!(sink.calls(), vec!["load stream://a", "stop", "load stream://b"]);
        let session = resolver.now_playing().await.unwrap();
        assert_eq!(session.snippet().title(), "b");
        assert_eq!(session.url(), "stream://b");
    }

    #[tokio::test]
    async fn test_superseded_resolution_is_dropped() {
        let sink = RecordingSink::default();
        let (resolver, gate) = youtube_resolver(sink.clone());
        let resolver = Arc::new(resolver);

        let slow = resolver.spawn_play(video("slow"));
        tokio::task::yield_now().await;

        resolver.resolve_and_play(&video("fast")).await.unwrap();
        gate.notify_one();

        let err = slow.await.unwrap().unwrap_err();
        assert!(matches!(err, SourceError::Cancelled));
        assert_eq!(sink.calls(), vec!["load stream://fast"]);
        assert_eq!(resolver.now_playing().await.unwrap().snippet().title(), "fast");
    }

    #[tokio::test]
    async fn test_controls_require_a_session() {
        let sink = RecordingSink::default();
        let (resolver, _gate) = youtube_resolver(sink.clone());

        resolver.pause().await.unwrap();
        resolver.replay().await.unwrap();
        assert_eq!(resolver.position().await.unwrap(), None);
        assert!(sink.calls().is_empty());

        resolver.resolve_and_play(&video("a")).await.unwrap();
        resolver.pause().await.unwrap();
        resolver.seek(12.5).await.unwrap();
        resolver.replay().await.unwrap();

        assert_eq!(
            sink.calls(),
            vec!["load stream://a", "pause", "seek 12.5", "seek 0", "resume"]
        );
        assert_eq!(resolver.position().await.unwrap(), Some(42.0));
        assert_eq!(resolver.duration().await.unwrap(), Some(180.0));
    }

    #[tokio::test]
    async fn test_stop_clears_session() {
        let sink = RecordingSink::default();
        let (resolver, _gate) = youtube_resolver(sink.clone());

        resolver.resolve_and_play(&video("a")).await.unwrap();
        resolver.stop().await.unwrap();
        resolver.stop().await.unwrap();

        assert_eq!(sink.calls(), vec!["load stream://a", "stop"]);
        assert!(resolver.now_playing().await.is_none());
    }
}
