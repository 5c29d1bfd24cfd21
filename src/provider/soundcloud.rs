use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SourceError};
use crate::provider::{Backend, Page, ProviderKind, Snippet, SnippetPayload};
use crate::state::{credentials::CredentialCell, Config, SoundcloudConfig};
use crate::utils::scrape;

const DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Offset-paginated track search. Every call needs a `client_id`, scraped
/// once from the web player's JS bundles and shared through `CredentialCell`.
#[derive(Clone)]
pub struct SoundcloudProvider {
    http: reqwest::Client,
    config: SoundcloudConfig,
    user_agent: String,
    client_id: Arc<CredentialCell>,
}

#[derive(Deserialize)]
struct SearchResponse {
    collection: Vec<Value>,
}

#[derive(Deserialize)]
struct SoundcloudTrack {
    title: String,
    user: SoundcloudUser,
    created_at: String,
    media: SoundcloudMedia,
    track_authorization: String,
    /// Must be present; `null` means the track has no artwork
    #[serde(deserialize_with = "present_or_null")]
    artwork_url: Option<String>,
}

fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::deserialize(deserializer)
}

#[derive(Deserialize)]
struct SoundcloudUser {
    username: String,
}

#[derive(Deserialize)]
struct SoundcloudMedia {
    transcodings: Vec<SoundcloudTranscoding>,
}

#[derive(Deserialize)]
struct SoundcloudTranscoding {
    url: String,
}

#[derive(Deserialize)]
struct StreamResponse {
    url: String,
}

impl SoundcloudProvider {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self::with_credential(http, config, Arc::new(CredentialCell::new()))
    }

    /// Build a provider that shares its client id with others
    pub fn with_credential(
        http: reqwest::Client,
        config: &Config,
        client_id: Arc<CredentialCell>,
    ) -> Self {
        Self {
            http,
            config: config.soundcloud.clone(),
            user_agent: config.user_agent.clone(),
            client_id,
        }
    }

    pub fn credential(&self) -> &Arc<CredentialCell> {
        &self.client_id
    }

    pub fn page_size(&self) -> u32 {
        self.config.page_size
    }

    async fn client_id(&self) -> Result<String> {
        self.client_id
            .ensure(|| self.bootstrap_client_id())
            .await
            .map(str::to_string)
    }

    /// Load the web player, then scan its asset bundles from the last one
    /// backwards for the embedded client id.
    async fn bootstrap_client_id(&self) -> Result<String> {
        debug!(url = %self.config.web_url, "fetching SoundCloud landing page");
        let html = self
            .http
            .get(self.config.web_url.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let asset_prefix = format!("{}/assets/", self.config.asset_host);
        let scripts = scrape::asset_script_urls(&html, &asset_prefix);
        if scripts.is_empty() {
            return Err(SourceError::Bootstrap(format!(
                "no script bundles from {} on {}",
                asset_prefix, self.config.web_url
            )));
        }

        for script_url in scripts.iter().rev() {
            debug!(url = %script_url, "scanning bundle for client_id");
            let script = match self.get_text(script_url).await {
                Ok(script) => script,
                Err(err) => {
                    warn!(url = %script_url, "failed to fetch bundle: {}", err);
                    continue;
                }
            };
            if let Some(id) = scrape::client_id(&script) {
                return Ok(id.to_string());
            }
        }

        Err(SourceError::Bootstrap(format!(
            "client_id not found in {} bundles",
            scripts.len()
        )))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}

/// Build snippets from one search page. Items without `media` are skipped;
/// any other missing field or bad date fails the whole page.
pub fn parse_search_page(body: &str) -> Result<Vec<Snippet>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    response
        .collection
        .into_iter()
        .filter(|item| item.get("media").is_some_and(|media| !media.is_null()))
        .map(|item| {
            let track: SoundcloudTrack = serde_json::from_value(item)?;
            track.into_snippet()
        })
        .collect()
}

impl SoundcloudTrack {
    fn into_snippet(self) -> Result<Snippet> {
        let published_at = NaiveDateTime::parse_from_str(&self.created_at, DATE_PATTERN)
            .map_err(|source| SourceError::Date {
                value: self.created_at.clone(),
                source,
            })?
            .and_utc();

        let track_url = self
            .media
            .transcodings
            .into_iter()
            .nth(1)
            .map(|t| t.url)
            .ok_or_else(|| {
                SourceError::schema(format!("track {:?} has no second transcoding", self.title))
            })?;

        let title = match urlencoding::decode(&self.title) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => self.title.clone(),
        };

        Ok(Snippet::new(
            title,
            Some(self.user.username),
            Some(published_at),
            self.artwork_url.unwrap_or_default(),
            SnippetPayload::Soundcloud {
                track_url,
                track_authorization: self.track_authorization,
            },
        ))
    }
}

#[async_trait]
impl Backend for SoundcloudProvider {
    /// Offset of the next page
    type Cursor = u32;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Soundcloud
    }

    async fn fetch_page(&self, keyword: &str, offset: &u32) -> Result<Page<u32>> {
        let client_id = self.client_id().await?;
        let url = format!("{}/search", self.config.api_url);
        let limit = self.config.page_size.to_string();
        let offset_param = offset.to_string();

        debug!(%url, keyword, offset, "SoundCloud search");
        let body = self
            .http
            .get(&url)
            .query(&[
                ("q", keyword),
                ("client_id", client_id.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset_param.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(Page {
            snippets: parse_search_page(&body)?,
            next: offset + self.config.page_size,
        })
    }

    async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String> {
        let SnippetPayload::Soundcloud {
            track_url,
            track_authorization,
        } = snippet.payload()
        else {
            return Err(SourceError::UnsupportedSnippet(snippet.to_string()));
        };

        let client_id = self.client_id().await?;
        debug!(url = %track_url, "resolving SoundCloud stream");

        let stream: StreamResponse = self
            .http
            .get(track_url.as_str())
            .query(&[
                ("client_id", client_id.as_str()),
                ("track_authorization", track_authorization.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if stream.url.is_empty() {
            return Err(SourceError::Resolve(format!("empty stream URL for {}", snippet)));
        }
        Ok(stream.url)
    }
}
