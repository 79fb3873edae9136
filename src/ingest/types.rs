// src/ingest/types.rs
use std::time::Duration;

use crate::store::StoreError;

/// Search parameters sent to the provider for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
}

impl SearchRequest {
    pub const DEFAULT_MAX_RESULTS: u32 = 10;

    pub fn for_topic(topic: &str) -> Self {
        Self {
            query: topic.to_string(),
            max_results: Self::DEFAULT_MAX_RESULTS,
        }
    }
}

/// A search hit as the provider reported it, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawVideo {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<String>,
    pub thumbnail_url: Option<String>,
    pub channel_title: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The current credential is exhausted or throttled. Triggers key rotation.
    #[error("quota or rate limit hit (HTTP {status}, reason: {})", .reason.as_deref().unwrap_or("unspecified"))]
    QuotaExceeded { status: u16, reason: Option<String> },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The provider request itself timed out.
    #[error("provider request timed out after {0:?}")]
    Timeout(Duration),

    /// The whole cycle (search plus store calls) overran its budget.
    #[error("cycle abandoned after {0:?}")]
    CycleTimeout(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FetchError {
    pub fn is_quota(&self) -> bool {
        matches!(self, FetchError::QuotaExceeded { .. })
    }

    /// The search side failed and the fetcher already dealt with it (logged,
    /// rotated where needed). Store trouble and cycle overruns are not included.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FetchError::QuotaExceeded { .. }
                | FetchError::Transport(_)
                | FetchError::Provider { .. }
                | FetchError::Malformed(_)
                | FetchError::Timeout(_)
        )
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::QuotaExceeded { .. } => "quota",
            FetchError::Transport(_) => "transport",
            FetchError::Provider { .. } => "provider",
            FetchError::Malformed(_) => "malformed",
            FetchError::Timeout(_) => "timeout",
            FetchError::CycleTimeout(_) => "cycle_timeout",
            FetchError::Store(_) => "store",
        }
    }
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        request: &SearchRequest,
        api_key: &str,
    ) -> Result<Vec<RawVideo>, FetchError>;
    fn name(&self) -> &'static str;
}
