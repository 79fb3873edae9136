use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogError, CatalogPage, CatalogService, ListRequest, DEFAULT_PAGE, DEFAULT_PER_PAGE};
use crate::ingest::scheduler::run_bounded;
use crate::ingest::{IngestStatus, StatusHandle, VideoFetcher};
use crate::store::VideoStore;

#[derive(Clone)]
pub struct AppState {
    catalog: CatalogService,
    store: Arc<dyn VideoStore>,
    fetcher: Arc<VideoFetcher>,
    ingest_status: StatusHandle,
    manual_topic: Arc<str>,
    cycle_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VideoStore>,
        fetcher: Arc<VideoFetcher>,
        ingest_status: StatusHandle,
        manual_topic: &str,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            catalog: CatalogService::new(Arc::clone(&store)),
            store,
            fetcher,
            ingest_status,
            manual_topic: Arc::from(manual_topic),
            cycle_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/videos", get(list_videos))
        .route("/test", get(test_connection))
        .route("/fetch_videos", get(trigger_fetch))
        .route("/ingest/status", get(ingest_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body: `{"status": <label>, "error": <detail>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    label: String,
    error: String,
}

impl ApiError {
    fn new(status: StatusCode, label: impl Into<String>, error: impl ToString) -> Self {
        Self {
            status,
            label: label.into(),
            error: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "status": self.label, "error": self.error })),
        )
            .into_response()
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::InvalidParam { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "Invalid pagination parameters", e)
            }
            CatalogError::Store(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load videos", e)
            }
        }
    }
}

/// Unparseable numbers fall back to the default; parsed values are validated downstream.
fn int_param(q: &HashMap<String, String>, name: &str, default: u64) -> i64 {
    q.get(name)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(default as i64)
}

async fn list_videos(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<CatalogPage>, ApiError> {
    let page = int_param(&q, "page", DEFAULT_PAGE);
    let per_page = int_param(&q, "per_page", DEFAULT_PER_PAGE);
    let query = q.get("query").map(String::as_str).unwrap_or_default();

    let req = ListRequest::new(page, per_page, query)?;
    let out = state.catalog.list(&req).await.map_err(|e| {
        tracing::error!(target: "api", error = %e, page, per_page, "listing videos failed");
        ApiError::from(e)
    })?;
    Ok(Json(out))
}

async fn test_connection(State(state): State<AppState>) -> Response {
    let backend = state.store.backend_name();
    match state.store.ping().await {
        Ok(()) => Json(json!({ "status": format!("{backend} connection successful") })).into_response(),
        Err(e) => {
            tracing::warn!(target: "api", backend, error = %e, "store ping failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{backend} connection failed"),
                e,
            )
            .into_response()
        }
    }
}

/// Runs one cycle on the manual topic. Search-side failures are handled inside
/// the cycle (rotation, logging), so they still answer 200 with the error attached;
/// only store failures and cycle overruns are server errors.
async fn trigger_fetch(State(state): State<AppState>) -> Response {
    let topic = state.manual_topic.as_ref();
    match run_bounded(&state.fetcher, topic, state.cycle_timeout).await {
        Ok(report) => Json(json!({
            "status": "Video fetching started.",
            "report": report,
        }))
        .into_response(),
        Err(e) if e.is_upstream() => {
            tracing::warn!(target: "api", topic, kind = e.kind(), error = %e, "manual fetch ended early");
            Json(json!({
                "status": "Video fetching started.",
                "kind": e.kind(),
                "error": e.to_string(),
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!(target: "api", topic, kind = e.kind(), error = %e, "manual fetch failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error in fetching videos",
                e,
            )
            .into_response()
        }
    }
}

async fn ingest_status(State(state): State<AppState>) -> Json<IngestStatus> {
    Json(state.ingest_status.snapshot())
}
