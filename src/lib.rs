//! Multi-backend media search: fan a keyword out to SoundCloud and YouTube,
//! merge what comes back, and resolve any result to a playable stream.

pub mod aggregator;
pub mod error;
pub mod playback;
pub mod provider;
pub mod state;
pub mod utils;

pub use aggregator::SearchAggregator;
pub use error::{Result, SourceError};
pub use provider::{ProviderKind, SearchSource, Snippet, SnippetPayload};
