use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::provider::{Backend, PageTicket, ProviderKind, SearchSource, Snippet};

struct PagerState<C> {
    last_keyword: Option<String>,
    cursor: C,
    busy: bool,
    results: Vec<Snippet>,
    last_error: Option<String>,
    /// Bumped on every dispatch and cancel; a finishing request whose
    /// generation is stale drops its page.
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

/// Per-backend pagination state machine.
///
/// `Idle -> Fetching` on `search_from_start`/`search_next`, back to `Idle`
/// when the page is processed, fails, or is cancelled. Calls made while
/// fetching are rejected, so pages of one backend never overlap.
///
/// Dispatching spawns onto the current tokio runtime.
pub struct Paginator<B: Backend> {
    backend: Arc<B>,
    state: Arc<Mutex<PagerState<B::Cursor>>>,
    busy_tx: Arc<watch::Sender<bool>>,
}

fn lock<C>(state: &Mutex<PagerState<C>>) -> MutexGuard<'_, PagerState<C>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: Backend> Paginator<B> {
    pub fn new(backend: B) -> Self {
        let (busy_tx, _) = watch::channel(false);
        Self {
            backend: Arc::new(backend),
            state: Arc::new(Mutex::new(PagerState {
                last_keyword: None,
                cursor: B::Cursor::default(),
                busy: false,
                results: Vec::new(),
                last_error: None,
                generation: 0,
                in_flight: None,
            })),
            busy_tx: Arc::new(busy_tx),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cursor(&self) -> B::Cursor {
        lock(&self.state).cursor.clone()
    }

    pub fn keyword(&self) -> Option<String> {
        lock(&self.state).last_keyword.clone()
    }

    fn dispatch(&self, state: &mut PagerState<B::Cursor>, keyword: String) -> PageTicket {
        state.busy = true;
        state.last_error = None;
        state.generation += 1;
        self.busy_tx.send_replace(true);

        let generation = state.generation;
        let cursor = state.cursor.clone();
        let kind = self.backend.kind();
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.state);
        let busy_tx = Arc::clone(&self.busy_tx);
        let (tx, rx) = oneshot::channel();

        debug!(%kind, %keyword, ?cursor, "dispatching page request");

        let handle = tokio::spawn(async move {
            let outcome = backend.fetch_page(&keyword, &cursor).await;

            let mut state = lock(&shared);
            if state.generation != generation {
                debug!(%kind, "dropping page of a cancelled request");
                return;
            }

            let reply = match outcome {
                Ok(page) => {
                    let count = page.snippets.len();
                    state.results.extend(page.snippets);
                    state.cursor = page.next;
                    info!(%kind, %keyword, count, total = state.results.len(), "page received");
                    Ok(count)
                }
                Err(err) => {
                    error!(%kind, %keyword, "page request failed: {}", err);
                    state.last_error = Some(err.to_string());
                    Err(err)
                }
            };

            state.busy = false;
            state.in_flight = None;
            busy_tx.send_replace(false);
            drop(state);

            let _ = tx.send(reply);
        });

        state.in_flight = Some(handle);
        PageTicket::new(rx)
    }
}

#[async_trait]
impl<B: Backend> SearchSource for Paginator<B> {
    fn kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    fn search_from_start(&self, keyword: &str) -> Option<PageTicket> {
        let mut state = lock(&self.state);
        if state.busy {
            warn!(kind = %self.kind(), "already searching, ignoring new search for {:?}", keyword);
            return None;
        }

        state.last_keyword = Some(keyword.to_string());
        state.cursor = B::Cursor::default();
        state.results.clear();

        Some(self.dispatch(&mut state, keyword.to_string()))
    }

    fn search_next(&self) -> Option<PageTicket> {
        let mut state = lock(&self.state);
        if state.busy {
            warn!(kind = %self.kind(), "already searching, ignoring next page");
            return None;
        }

        let Some(keyword) = state.last_keyword.clone() else {
            warn!(kind = %self.kind(), "next page requested before any search");
            return None;
        };

        Some(self.dispatch(&mut state, keyword))
    }

    fn is_busy(&self) -> bool {
        lock(&self.state).busy
    }

    fn results(&self) -> Vec<Snippet> {
        lock(&self.state).results.clone()
    }

    fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    fn cancel(&self) {
        let mut state = lock(&self.state);
        if !state.busy {
            warn!(kind = %self.kind(), "cancel requested while not searching");
            return;
        }

        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
        state.generation += 1;
        state.busy = false;
        self.busy_tx.send_replace(false);
        info!(kind = %self.kind(), "search cancelled");
    }

    fn idle_signal(&self) -> watch::Receiver<bool> {
        self.busy_tx.subscribe()
    }

    async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String> {
        self.backend.resolve_playable_url(snippet).await
    }
}

impl<B: Backend> Drop for Paginator<B> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.state).in_flight.take() {
            handle.abort();
        }
    }
}
