//! Text extraction from web pages that embed the data we need.
//!
//! Every function here depends on markup the backends may change at any
//! time. The markers are listed as constants so a breaking change shows up
//! in one place and in the tests below.

use serde_json::Value;

/// Prefix of the script tags that load SoundCloud's JS bundles
pub const ASSET_SCRIPT_MARKER: &str = "<script crossorigin src=\"";
/// Start of the search results JSON assigned inline on YouTube's results page
pub const INITIAL_DATA_MARKER: &str = "var ytInitialData =";
pub const SCRIPT_END: &str = "</script>";
pub const CLIENT_ID_MARKER: &str = "client_id=";
const API_KEY_MARKERS: [&str; 2] = ["\"INNERTUBE_API_KEY\":\"", "\"innertubeApiKey\":\""];
const CONTEXT_MARKER: &str = "\"INNERTUBE_CONTEXT\":";

/// Text between the first `first` and the next `last` after it.
///
/// `clip("@#Example@#", "@#", "@#") == Some("Example")`
pub fn clip<'a>(target: &'a str, first: &str, last: &str) -> Option<&'a str> {
    let start = target.find(first)? + first.len();
    let len = target[start..].find(last)?;
    Some(&target[start..start + len])
}

/// URLs of every `<script crossorigin src=...>` bundle served from `asset_prefix`,
/// in page order.
pub fn asset_script_urls(html: &str, asset_prefix: &str) -> Vec<String> {
    html.split(ASSET_SCRIPT_MARKER)
        .skip(1)
        .filter_map(|tail| tail.split('"').next())
        .filter(|src| src.starts_with(asset_prefix) && src.ends_with(".js"))
        .map(str::to_string)
        .collect()
}

/// SoundCloud client id baked into a JS bundle
pub fn client_id(script: &str) -> Option<&str> {
    clip(script, CLIENT_ID_MARKER, "\"").filter(|id| !id.is_empty())
}

/// Raw JSON text of `ytInitialData`, or `None` if the page has no such block.
pub fn initial_data(html: &str) -> Option<&str> {
    let (_, tail) = html.split_once(INITIAL_DATA_MARKER)?;
    let block = tail.split(SCRIPT_END).next()?;
    Some(block.trim().trim_end_matches(';'))
}

/// InnerTube API key used to request continuation pages
pub fn innertube_api_key(html: &str) -> Option<&str> {
    API_KEY_MARKERS
        .iter()
        .find_map(|marker| clip(html, marker, "\""))
        .filter(|key| !key.is_empty())
}

/// `INNERTUBE_CONTEXT` object, parsed from the JSON value right after its key.
pub fn innertube_context(html: &str) -> Option<Value> {
    let start = html.find(CONTEXT_MARKER)? + CONTEXT_MARKER.len();
    serde_json::Deserializer::from_str(&html[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
        .filter(Value::is_object)
}
