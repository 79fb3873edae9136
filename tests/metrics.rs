// tests/metrics.rs
//
// One process-wide recorder per test binary, so everything lives in a single test.
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use video_catalog::ingest::types::{FetchError, RawVideo, SearchProvider, SearchRequest};
use video_catalog::ingest::{IngestDriver, IngestSchedulerCfg, KeyRotator, TopicScheduler, VideoFetcher};
use video_catalog::metrics::Metrics;
use video_catalog::store::InMemoryStore;

struct OneHit;

#[async_trait::async_trait]
impl SearchProvider for OneHit {
    async fn search(&self, req: &SearchRequest, _key: &str) -> Result<Vec<RawVideo>, FetchError> {
        if req.query == "quota" {
            return Err(FetchError::QuotaExceeded {
                status: 429,
                reason: None,
            });
        }
        Ok(vec![RawVideo {
            video_id: Some("m1".into()),
            title: Some("Metric clip".into()),
            description: Some(String::new()),
            published_at: Some("2024-03-03T03:03:03Z".into()),
            thumbnail_url: Some("https://i.ytimg.com/vi/m1/default.jpg".into()),
            channel_title: Some("Chan".into()),
        }])
    }

    fn name(&self) -> &'static str {
        "one-hit"
    }
}

#[tokio::test]
async fn metrics_endpoint_contains_ingest_series() {
    let metrics = Metrics::init().expect("first recorder in this process");

    let rotator = Arc::new(KeyRotator::from_csv("a,b").unwrap());
    let fetcher = Arc::new(VideoFetcher::new(
        Arc::new(OneHit),
        rotator,
        Arc::new(InMemoryStore::new()),
    ));
    let driver = IngestDriver::new(
        fetcher,
        TopicScheduler::new(vec!["news".into()]).unwrap(),
        IngestSchedulerCfg::default(),
    );
    driver.run_cycle("news").await.unwrap();
    driver.run_cycle("news").await.unwrap();
    assert!(driver.run_cycle("quota").await.unwrap_err().is_quota());

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "ingest_cycles_total 3",
        "ingest_cycle_failures_total 1",
        "ingest_key_rotations_total 1",
        "ingest_videos_inserted_total 1",
        "ingest_videos_existing_total 1",
        "ingest_last_cycle_ts",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }

    // Second install in the same process is refused.
    assert!(Metrics::init().is_err());
}
