use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Soundcloud,
    Youtube,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Soundcloud => write!(f, "soundcloud"),
            ProviderKind::Youtube => write!(f, "youtube"),
        }
    }
}

/// Backend-specific data needed to turn a snippet into a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetPayload {
    Soundcloud {
        /// Transcoding endpoint, queried with the client id to get the stream URL
        track_url: String,
        track_authorization: String,
    },
    Youtube {
        video_id: String,
    },
}

/// One discovered media item. Built by response parsing, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    title: String,
    publisher: Option<String>,
    published_at: Option<DateTime<Utc>>,
    thumbnail: String,
    payload: SnippetPayload,
}

impl Snippet {
    pub fn new(
        title: impl Into<String>,
        publisher: Option<String>,
        published_at: Option<DateTime<Utc>>,
        thumbnail: impl Into<String>,
        payload: SnippetPayload,
    ) -> Self {
        Self {
            title: title.into(),
            publisher,
            published_at,
            thumbnail: thumbnail.into(),
            payload,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }

    pub fn payload(&self) -> &SnippetPayload {
        &self.payload
    }

    pub fn provider(&self) -> ProviderKind {
        match self.payload {
            SnippetPayload::Soundcloud { .. } => ProviderKind::Soundcloud,
            SnippetPayload::Youtube { .. } => ProviderKind::Youtube,
        }
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.publisher {
            Some(publisher) => write!(f, "{} - {}", self.title, publisher),
            None => write!(f, "{}", self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_follows_payload() {
        let snippet = Snippet::new(
            "Song",
            None,
            None,
            "https://i.ytimg.com/vi/abc/hq.jpg",
            SnippetPayload::Youtube {
                video_id: "abc".to_string(),
            },
        );
        assert_eq!(snippet.provider(), ProviderKind::Youtube);
        assert_eq!(snippet.to_string(), "Song");
    }

    #[test]
    fn test_display_with_publisher() {
        let snippet = Snippet::new(
            "Song",
            Some("Artist".to_string()),
            None,
            "",
            SnippetPayload::Soundcloud {
                track_url: "https://api/tracks/1/stream".to_string(),
                track_authorization: "auth".to_string(),
            },
        );
        assert_eq!(snippet.provider(), ProviderKind::Soundcloud);
        assert_eq!(snippet.to_string(), "Song - Artist");
    }
}
