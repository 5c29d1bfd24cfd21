mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use unisound::provider::{Paginator, SoundcloudProvider, YoutubeProvider};
use unisound::state::CredentialCell;
use unisound::{ProviderKind, SearchAggregator, SearchSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config_for, results_page, soundcloud_track, video};

#[tokio::test]
async fn test_both_backends_merge_in_registry_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "collection": [soundcloud_track(&server.uri(), 1, "Track")] }))
                // arrive after YouTube
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(vec![
            json!({ "itemSectionRenderer": { "contents": [video("v1", "Video")] } }),
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let http = config.http_client().unwrap();
    let soundcloud: Arc<dyn SearchSource> = Arc::new(Paginator::new(
        SoundcloudProvider::with_credential(
            http.clone(),
            &config,
            Arc::new(CredentialCell::with_token("AbC123xyz")),
        ),
    ));
    let youtube: Arc<dyn SearchSource> = Arc::new(Paginator::new(YoutubeProvider::new(http, &config)));
    let aggregator = SearchAggregator::new(vec![Arc::clone(&soundcloud), Arc::clone(&youtube)]);

    assert_eq!(aggregator.search_all("mix"), 2);
    let merged = aggregator.await_all_idle().await;

    assert!(!aggregator.is_busy());
    let kinds: Vec<_> = merged.iter().map(|s| s.provider()).collect();
    assert_eq!(kinds, vec![ProviderKind::Soundcloud, ProviderKind::Youtube]);

    let mut expected = soundcloud.results();
    expected.extend(youtube.results());
    assert_eq!(merged, expected);
    assert!(aggregator.errors().is_empty());
}

#[tokio::test]
async fn test_one_backend_down_the_other_still_merges() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(vec![
            json!({ "itemSectionRenderer": { "contents": [video("v1", "Video")] } }),
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let http = config.http_client().unwrap();
    let aggregator = SearchAggregator::new(vec![
        Arc::new(Paginator::new(SoundcloudProvider::with_credential(
            http.clone(),
            &config,
            Arc::new(CredentialCell::with_token("AbC123xyz")),
        ))),
        Arc::new(Paginator::new(YoutubeProvider::new(http, &config))),
    ]);

    aggregator.search_all("mix");
    let merged = aggregator
        .await_all_idle_timeout(Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].title(), "Video");
    let errors = aggregator.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, ProviderKind::Soundcloud);
}
