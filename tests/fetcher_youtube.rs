// tests/fetcher_youtube.rs
//
// VideoFetcher + YouTubeProvider against a mocked Data API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use video_catalog::ingest::providers::youtube::YouTubeProvider;
use video_catalog::ingest::{KeyRotator, VideoFetcher};
use video_catalog::store::{InMemoryStore, VideoStore};

fn item(id: &str, title: &str, published: &str) -> serde_json::Value {
    json!({
        "kind": "youtube#searchResult",
        "id": {"kind": "youtube#video", "videoId": id},
        "snippet": {
            "publishedAt": published,
            "channelId": "UC123",
            "title": title,
            "description": "desc",
            "thumbnails": {
                "default": {"url": format!("https://i.ytimg.com/vi/{id}/default.jpg")},
                "medium": {"url": format!("https://i.ytimg.com/vi/{id}/mqdefault.jpg")}
            },
            "channelTitle": "Uploader"
        }
    })
}

fn fetcher(server: &MockServer, keys: &str, timeout: Duration) -> (VideoFetcher, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let provider = Arc::new(YouTubeProvider::new(server.uri(), timeout).unwrap());
    let rotator = Arc::new(KeyRotator::from_csv(keys).unwrap());
    (VideoFetcher::new(provider, rotator, store.clone()), store)
}

#[tokio::test]
async fn sends_search_parameters_and_normalizes_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "space exploration"))
        .and(query_param("type", "video"))
        .and(query_param("part", "id,snippet"))
        .and(query_param("order", "date"))
        .and(query_param("maxResults", "10"))
        .and(query_param("key", "first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "youtube#searchListResponse",
            "items": [
                item("a1", "Mars &#39;24 landing", "2024-07-01T09:30:00+02:00"),
                item("a2", "ISS tour", "2024-07-01T06:00:00Z")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (f, store) = fetcher(&server, "first,second", Duration::from_secs(2));
    let report = f.fetch_and_store("space exploration").await.unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.key_index, 0);

    let a1 = store.get("a1").unwrap();
    assert_eq!(a1.title, "Mars '24 landing");
    assert_eq!(a1.publish_date, "2024-07-01T07:30:00Z");
    assert_eq!(a1.thumbnail_url, "https://i.ytimg.com/vi/a1/default.jpg");
    assert_eq!(a1.channel_name, "Uploader");
    assert_eq!(a1.description, "desc");
}

#[tokio::test]
async fn quota_response_moves_next_call_to_the_next_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("key", "first"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "The request cannot be completed because you have exceeded your quota.",
                "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("key", "second"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [item("b1", "Fresh", "2024-07-02T00:00:00Z")]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (f, store) = fetcher(&server, "first,second", Duration::from_secs(2));

    let err = f.fetch_and_store("news").await.unwrap_err();
    assert!(err.is_quota(), "got {err:?}");
    assert_eq!(f.rotator().index(), 1);
    assert!(store.is_empty());

    let report = f.fetch_and_store("news").await.unwrap();
    assert_eq!(report.key_index, 1);
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn server_error_and_garbage_do_not_rotate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let (f, _store) = fetcher(&server, "first,second", Duration::from_secs(2));

    let err = f.fetch_and_store("broken").await.unwrap_err();
    assert_eq!(err.kind(), "provider");
    let err = f.fetch_and_store("garbled").await.unwrap_err();
    assert_eq!(err.kind(), "malformed");
    assert_eq!(f.rotator().index(), 0);
}

#[tokio::test]
async fn slow_provider_hits_the_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": []}))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let (f, _store) = fetcher(&server, "only", Duration::from_millis(100));
    let err = f.fetch_and_store("slow").await.unwrap_err();
    assert_eq!(err.kind(), "timeout");
    assert!(err.is_upstream());
    assert_eq!(f.rotator().index(), 0);
}

#[tokio::test]
async fn errors_never_leak_the_api_key() {
    // Nothing listens on port 9; the connection is refused.
    let store = Arc::new(InMemoryStore::new());
    let provider =
        Arc::new(YouTubeProvider::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
    let rotator = Arc::new(KeyRotator::from_csv("AIzaTopSecret").unwrap());
    let f = VideoFetcher::new(provider, rotator, store);

    let err = f.fetch_and_store("x").await.unwrap_err();
    assert!(!err.to_string().contains("AIzaTopSecret"), "{err}");
}

#[tokio::test]
async fn concurrent_cycles_store_each_id_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                item("s1", "one", "2024-01-01T00:00:00Z"),
                item("s2", "two", "2024-01-02T00:00:00Z"),
                item("s3", "three", "2024-01-03T00:00:00Z")
            ]
        })))
        .mount(&server)
        .await;

    let (f, store) = fetcher(&server, "k", Duration::from_secs(2));
    let f = Arc::new(f);

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let f = Arc::clone(&f);
            tokio::spawn(async move { f.fetch_and_store("race").await })
        })
        .collect();

    let mut inserted = 0;
    for t in tasks {
        inserted += t.await.unwrap().unwrap().inserted;
    }
    assert_eq!(inserted, 3);
    assert_eq!(store.count(None).await.unwrap(), 3);
}
