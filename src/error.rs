//! Error taxonomy shared by every source adapter and the playback resolver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Network failure, timeout or non-success HTTP status
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not valid JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field or key path is missing from a backend response
    #[error("Unexpected response schema: {0}")]
    Schema(String),

    #[error("Unparseable date {value:?}: {source}")]
    Date {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The credential chain could not produce a token
    #[error("Credential bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Could not resolve a playable URL: {0}")]
    Resolve(String),

    /// No adapter is registered for this snippet's backend
    #[error("Unsupported snippet: {0}")]
    UnsupportedSnippet(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Playback sink error: {0}")]
    Playback(#[from] anyhow::Error),
}

impl SourceError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Transport and cancellation failures leave the response unread;
    /// everything else means the backend answered with something unusable.
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Http(_) | SourceError::Cancelled)
    }
}
