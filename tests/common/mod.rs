#![allow(dead_code)]

use serde_json::{json, Value};
use unisound::state::Config;

/// Config whose every backend host points at `uri`
pub fn config_for(uri: &str) -> Config {
    let mut config = Config::default();
    config.request_timeout_secs = 5;
    config.soundcloud.api_url = uri.to_string();
    config.soundcloud.web_url = uri.to_string();
    config.soundcloud.asset_host = uri.to_string();
    config.youtube.host_url = uri.to_string();
    config
}

pub fn soundcloud_track(uri: &str, id: u32, title: &str) -> Value {
    json!({
        "title": title,
        "user": { "username": format!("artist{}", id) },
        "created_at": "2020-01-02T03:04:05Z",
        "media": {
            "transcodings": [
                { "url": format!("{}/media/{}/stream/hls", uri, id) },
                { "url": format!("{}/media/{}/stream/progressive", uri, id) }
            ]
        },
        "track_authorization": format!("auth-{}", id),
        "artwork_url": null
    })
}

pub fn video(id: &str, title: &str) -> Value {
    json!({
        "videoRenderer": {
            "videoId": id,
            "thumbnail": { "thumbnails": [{ "url": format!("https://i.ytimg.com/vi/{}/hq.jpg", id) }] },
            "title": { "runs": [{ "text": title }] },
            "ownerText": { "runs": [{ "text": "Channel" }] }
        }
    })
}

pub fn continuation_item(token: &str) -> Value {
    json!({
        "continuationItemRenderer": {
            "continuationEndpoint": { "continuationCommand": { "token": token } }
        }
    })
}

/// Results page HTML embedding `items` as the first page of results
pub fn results_page(items: Vec<Value>) -> String {
    let initial = json!({
        "contents": {
            "twoColumnSearchResultsRenderer": {
                "primaryContents": {
                    "sectionListRenderer": { "contents": items }
                }
            }
        }
    });
    format!(
        "<html><head><script>ytcfg.set({{\"INNERTUBE_API_KEY\":\"KEY123\",\
         \"INNERTUBE_CONTEXT\":{{\"client\":{{\"clientName\":\"WEB\",\"clientVersion\":\"2.20240101\"}}}}}});</script>\
         </head><body><script nonce=\"n\">var ytInitialData = {};</script></body></html>",
        initial
    )
}
