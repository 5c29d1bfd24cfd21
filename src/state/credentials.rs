use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Result, SourceError};

/// Process-lifetime memo for a backend access token.
///
/// The first `ensure` runs the bootstrap chain; concurrent callers wait on
/// that same attempt instead of starting their own. A failed attempt is
/// not remembered, the next caller retries. Once set, the token never
/// changes.
#[derive(Debug, Default)]
pub struct CredentialCell {
    token: OnceCell<String>,
    attempts: AtomicUsize,
}

impl CredentialCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cell with a known token (skips bootstrap entirely)
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: OnceCell::new_with(Some(token.into())),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.token.get().map(String::as_str)
    }

    /// Return the cached token, running `bootstrap` first if there is none.
    pub async fn ensure<F, Fut>(&self, bootstrap: F) -> Result<&str>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(token) = self.get() {
            return Ok(token);
        }

        let token = self
            .token
            .get_or_try_init(|| async {
                let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(attempt, "bootstrapping credential");
                let token = bootstrap().await?;
                info!("credential acquired");
                Ok::<_, SourceError>(token)
            })
            .await?;

        Ok(token.as_str())
    }

    /// How many bootstrap chains were started so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
