// src/ingest/mod.rs
pub mod config;
pub mod fetcher;
pub mod providers;
pub mod rotator;
pub mod scheduler;
pub mod topics;
pub mod types;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::ingest::types::RawVideo;
use crate::store::Video;

pub use fetcher::{FetchReport, VideoFetcher};
pub use rotator::KeyRotator;
pub use scheduler::{DriverState, IngestDriver, IngestSchedulerCfg, IngestStatus, StatusHandle};
pub use topics::TopicScheduler;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_cycles_total", "Fetch cycles started.");
        describe_counter!(
            "ingest_cycle_failures_total",
            "Cycles abandoned because of a fetch, store or timeout failure."
        );
        describe_counter!(
            "ingest_videos_fetched_total",
            "Search hits returned by the provider."
        );
        describe_counter!(
            "ingest_videos_inserted_total",
            "Videos written to the catalog for the first time."
        );
        describe_counter!(
            "ingest_videos_existing_total",
            "Search hits skipped because the id was already stored."
        );
        describe_counter!(
            "ingest_insert_failures_total",
            "Inserts that failed for a reason other than a duplicate id."
        );
        describe_counter!(
            "ingest_key_rotations_total",
            "API key rotations after quota or rate-limit responses."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Non-2xx responses from the search provider."
        );
        describe_histogram!("ingest_fetch_ms", "Provider round-trip in milliseconds.");
        describe_gauge!(
            "ingest_last_cycle_ts",
            "Unix ts when the last ingest cycle finished."
        );
    });
}

/// Decode HTML entities (YouTube escapes snippet text), collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Re-emit as RFC 3339 UTC so string order equals time order.
/// Unparseable values are kept verbatim rather than dropped.
pub fn normalize_publish_date(s: &str) -> String {
    let s = s.trim();
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(_) => s.to_string(),
    }
}

/// Turns a raw search hit into a catalog entry. Hits without a video id are dropped.
pub fn normalize_video(raw: RawVideo) -> Option<Video> {
    let id = raw.video_id.map(|s| s.trim().to_string())?;
    if id.is_empty() {
        return None;
    }

    let description = raw
        .description
        .map(|d| html_escape::decode_html_entities(&d).trim().to_string())
        .unwrap_or_default();

    Some(Video {
        id,
        title: normalize_text(raw.title.as_deref().unwrap_or_default()),
        description,
        publish_date: normalize_publish_date(raw.published_at.as_deref().unwrap_or_default()),
        thumbnail_url: raw.thumbnail_url.unwrap_or_default(),
        channel_name: normalize_text(raw.channel_title.as_deref().unwrap_or_default()),
    })
}
