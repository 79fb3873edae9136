use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::ingest::types::{FetchError, RawVideo, SearchProvider, SearchRequest};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Error reasons YouTube uses for exhausted or throttled keys, whatever the HTTP status.
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "dailyLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    published_at: Option<String>,
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

/// YouTube Data API v3 `search.list` client.
pub struct YouTubeProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl YouTubeProvider {
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("video-catalog/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            return FetchError::Timeout(self.timeout);
        }
        // The request URL carries the key as a query parameter; keep it out of errors.
        FetchError::Transport(e.without_url().to_string())
    }

    fn parse_items_from_str(body: &str) -> Result<Vec<RawVideo>, FetchError> {
        let resp: SearchResponse =
            serde_json::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let out = resp
            .items
            .into_iter()
            .map(|it| {
                let snippet = it.snippet;
                let thumbnail_url = snippet
                    .as_ref()
                    .and_then(|s| s.thumbnails.as_ref())
                    .and_then(|t| t.default.as_ref().or(t.medium.as_ref()).or(t.high.as_ref()))
                    .map(|t| t.url.clone());
                let (title, description, published_at, channel_title) = match snippet {
                    Some(s) => (s.title, s.description, s.published_at, s.channel_title),
                    None => (None, None, None, None),
                };
                RawVideo {
                    video_id: it.id.video_id,
                    title,
                    description,
                    published_at,
                    thumbnail_url,
                    channel_title,
                }
            })
            .collect::<Vec<_>>();

        counter!("ingest_videos_fetched_total").increment(out.len() as u64);
        Ok(out)
    }
}

/// Maps a non-2xx response to the error taxonomy. 403/429 or a quota reason means "rotate".
pub fn classify_failure(status: u16, body: &str) -> FetchError {
    let api_error = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error);
    let reason = api_error
        .as_ref()
        .and_then(|e| e.errors.iter().find_map(|d| d.reason.clone()));
    let quota_reason = reason
        .as_deref()
        .is_some_and(|r| QUOTA_REASONS.contains(&r));

    if status == 403 || status == 429 || quota_reason {
        return FetchError::QuotaExceeded { status, reason };
    }

    let message = api_error
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.chars().take(200).collect());
    FetchError::Provider { status, message }
}

#[async_trait]
impl SearchProvider for YouTubeProvider {
    async fn search(
        &self,
        request: &SearchRequest,
        api_key: &str,
    ) -> Result<Vec<RawVideo>, FetchError> {
        let t0 = Instant::now();
        let max_results = request.max_results.to_string();

        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "id,snippet"),
                ("type", "video"),
                ("order", "date"),
                ("q", request.query.as_str()),
                ("maxResults", max_results.as_str()),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            counter!("ingest_provider_errors_total").increment(1);
            return Err(classify_failure(status.as_u16(), &body));
        }
        Self::parse_items_from_str(&body)
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }
}
