use std::fmt;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};

use crate::error::{Result, SourceError};
use crate::provider::{ProviderKind, Snippet};

/// A parsed page and the cursor that fetches the page after it.
#[derive(Debug)]
pub struct Page<C> {
    pub snippets: Vec<Snippet>,
    pub next: C,
}

/// Handle on one dispatched page request.
///
/// Dropping it is fine: the request keeps running and its snippets still
/// land in the adapter's results.
#[derive(Debug)]
pub struct PageTicket {
    rx: oneshot::Receiver<Result<usize>>,
}

impl PageTicket {
    pub(crate) fn new(rx: oneshot::Receiver<Result<usize>>) -> Self {
        Self { rx }
    }

    /// Wait for the page to be processed. Yields the number of snippets appended.
    pub async fn wait(self) -> Result<usize> {
        self.rx.await.unwrap_or(Err(SourceError::Cancelled))
    }
}

/// Search-and-paginate plus URL resolution for one backend.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Reset pagination and request the first page for `keyword`.
    /// Returns `None` when a request is already in flight.
    fn search_from_start(&self, keyword: &str) -> Option<PageTicket>;

    /// Request the next page of the last keyword.
    /// Returns `None` when busy or when no search was started yet.
    fn search_next(&self) -> Option<PageTicket>;

    fn is_busy(&self) -> bool;

    /// Snippets accumulated so far, in arrival order
    fn results(&self) -> Vec<Snippet>;

    /// Message of the most recent failed page, if it failed
    fn last_error(&self) -> Option<String>;

    /// Abort the in-flight request, if any, and go back to idle
    fn cancel(&self);

    /// Watch channel carrying the busy flag; flips to `false` when a page settles.
    fn idle_signal(&self) -> watch::Receiver<bool>;

    /// Turn a snippet this source produced into a playable stream URL
    async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String>;
}

/// Wire protocol of one backend. Stateless apart from shared credentials;
/// all pagination state lives in the cursor.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Pagination position. `Default` is the first page.
    type Cursor: Clone + Default + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> ProviderKind;

    async fn fetch_page(&self, keyword: &str, cursor: &Self::Cursor) -> Result<Page<Self::Cursor>>;

    async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String>;
}
