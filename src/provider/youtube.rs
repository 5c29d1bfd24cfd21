use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Result, SourceError};
use crate::provider::{Backend, Page, ProviderKind, Snippet, SnippetPayload};
use crate::state::{Config, YoutubeConfig};
use crate::utils::scrape;

const FIRST_PAGE_ITEMS: &str = "/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents";
const NEXT_PAGE_ITEMS: &str = "/onResponseReceivedCommands/0/appendContinuationItemsAction/continuationItems";
const CONTINUATION_TOKEN: &str = "/continuationItemRenderer/continuationEndpoint/continuationCommand/token";

/// Video search scraped from the public results page. The first page is
/// HTML with the results embedded as JSON; later pages come from the
/// InnerTube API using the key and context found on that first page.
#[derive(Clone)]
pub struct YoutubeProvider {
    http: reqwest::Client,
    config: YoutubeConfig,
    user_agent: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum YoutubeCursor {
    #[default]
    Start,
    Continue(Continuation),
    /// No continuation token was offered, nothing left to fetch
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub token: String,
    pub api_key: String,
    pub context: Value,
}

impl YoutubeProvider {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            config: config.youtube.clone(),
            user_agent: config.user_agent.clone(),
        }
    }

    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch?v={}", self.config.host_url, video_id)
    }

    async fn first_page(&self, keyword: &str) -> Result<Page<YoutubeCursor>> {
        let url = format!(
            "{}/results?search_query={}&sp={}",
            self.config.host_url,
            urlencoding::encode(keyword),
            self.config.video_filter
        );

        debug!(%url, "YouTube first page");
        let html = self
            .http
            .get(&url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_first_page(&html)
    }

    async fn next_page(&self, continuation: &Continuation) -> Result<Page<YoutubeCursor>> {
        let url = format!(
            "{}/youtubei/v1/search?key={}",
            self.config.host_url, continuation.api_key
        );
        let body = json!({
            "context": continuation.context,
            "continuation": continuation.token,
        });

        debug!(%url, "YouTube continuation page");
        let response: Value = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_continuation_page(&response, continuation)
    }
}

/// Parse the HTML results page. A page without `ytInitialData` has no
/// results; that is not an error.
pub fn parse_first_page(html: &str) -> Result<Page<YoutubeCursor>> {
    let Some(raw) = scrape::initial_data(html) else {
        debug!("no ytInitialData on results page, treating as empty");
        return Ok(Page {
            snippets: Vec::new(),
            next: YoutubeCursor::Exhausted,
        });
    };

    let initial: Value = serde_json::from_str(raw)?;
    let items = array_at(&initial, FIRST_PAGE_ITEMS)?;
    let (snippets, token) = parse_items(items)?;

    let next = match token {
        None => YoutubeCursor::Exhausted,
        Some(token) => {
            match (scrape::innertube_api_key(html), scrape::innertube_context(html)) {
                (Some(api_key), Some(context)) => YoutubeCursor::Continue(Continuation {
                    token,
                    api_key: api_key.to_string(),
                    context,
                }),
                _ => {
                    warn!("results page has a continuation but no InnerTube key/context");
                    YoutubeCursor::Exhausted
                }
            }
        }
    };

    Ok(Page { snippets, next })
}

pub fn parse_continuation_page(
    response: &Value,
    previous: &Continuation,
) -> Result<Page<YoutubeCursor>> {
    let items = array_at(response, NEXT_PAGE_ITEMS)?;
    let (snippets, token) = parse_items(items)?;

    let next = match token {
        Some(token) => YoutubeCursor::Continue(Continuation {
            token,
            ..previous.clone()
        }),
        None => YoutubeCursor::Exhausted,
    };

    Ok(Page { snippets, next })
}

fn array_at<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>> {
    value
        .pointer(path)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::schema(format!("no array at {}", path)))
}

/// Videos of every item section plus the continuation token, if offered.
fn parse_items(items: &[Value]) -> Result<(Vec<Snippet>, Option<String>)> {
    let token = items
        .iter()
        .find_map(|item| item.pointer(CONTINUATION_TOKEN).and_then(Value::as_str))
        .map(str::to_string);

    let snippets = items
        .iter()
        .filter_map(|item| item.pointer("/itemSectionRenderer/contents").and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| entry.get("videoRenderer"))
        .filter(|renderer| renderer.get("videoId").is_some())
        .map(parse_video)
        .collect::<Result<Vec<_>>>()?;

    Ok((snippets, token))
}

fn parse_video(renderer: &Value) -> Result<Snippet> {
    let field = |path: &str| {
        renderer
            .pointer(path)
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::schema(format!("videoRenderer without {}", path)))
    };

    let video_id = field("/videoId")?;
    let thumbnail = field("/thumbnail/thumbnails/0/url")?;
    let title = field("/title/runs/0/text")?;
    let publisher = renderer
        .pointer("/ownerText/runs/0/text")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(Snippet::new(
        title,
        publisher,
        None,
        thumbnail,
        SnippetPayload::Youtube {
            video_id: video_id.to_string(),
        },
    ))
}

/// Ask yt-dlp for the direct audio stream behind a watch page.
pub async fn fetch_audio_url(ytdlp: &str, watch_url: &str, limit: Duration) -> Result<String> {
    use tokio::process::Command;
    use tokio::time::timeout;

    let fetch = Command::new(ytdlp)
        .args(["-f", "bestaudio", "-g", "--no-warnings", "--no-playlist", watch_url])
        .kill_on_drop(true)
        .output();

    let output = timeout(limit, fetch)
        .await
        .map_err(|_| {
            SourceError::Resolve(format!("yt-dlp timed out after {} seconds", limit.as_secs()))
        })?
        .map_err(|e| SourceError::Resolve(format!("failed to run {}: {}", ytdlp, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SourceError::Resolve(format!(
            "yt-dlp failed: {}",
            stderr.lines().next().unwrap_or("unknown error")
        )));
    }

    let url = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    if url.is_empty() {
        return Err(SourceError::Resolve("yt-dlp returned empty URL".to_string()));
    }

    Ok(url)
}

#[async_trait]
impl Backend for YoutubeProvider {
    type Cursor = YoutubeCursor;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Youtube
    }

    async fn fetch_page(&self, keyword: &str, cursor: &YoutubeCursor) -> Result<Page<YoutubeCursor>> {
        match cursor {
            YoutubeCursor::Start => self.first_page(keyword).await,
            YoutubeCursor::Continue(continuation) => self.next_page(continuation).await,
            YoutubeCursor::Exhausted => {
                debug!(keyword, "no more YouTube pages");
                Ok(Page {
                    snippets: Vec::new(),
                    next: YoutubeCursor::Exhausted,
                })
            }
        }
    }

    async fn resolve_playable_url(&self, snippet: &Snippet) -> Result<String> {
        let SnippetPayload::Youtube { video_id } = snippet.payload() else {
            return Err(SourceError::UnsupportedSnippet(snippet.to_string()));
        };

        let watch_url = self.watch_url(video_id);
        debug!(%watch_url, "resolving YouTube audio stream");
        fetch_audio_url(
            &self.config.ytdlp_path,
            &watch_url,
            self.config.resolve_timeout(),
        )
        .await
    }
}
