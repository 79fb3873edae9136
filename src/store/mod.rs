// src/store/mod.rs
//! Catalog persistence: the `VideoStore` contract plus its MongoDB and in-memory backends.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

/// A stored catalog entry. Keyed by the provider's video id and never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    /// RFC 3339 timestamp; the only recency sort key.
    pub publish_date: String,
    pub thumbnail_url: String,
    pub channel_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The id was already present. Expected steady-state, not an error.
    Duplicate,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store operation failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Unanchored, case-insensitive, literal substring match on `title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleFilter {
    needle: String,
    needle_lower: String,
}

impl TitleFilter {
    /// Returns `None` for an empty query, which means "no filter".
    pub fn new(query: &str) -> Option<Self> {
        if query.is_empty() {
            return None;
        }
        Some(Self {
            needle: query.to_string(),
            needle_lower: query.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, title: &str) -> bool {
        title.to_lowercase().contains(&self.needle_lower)
    }

    /// Regex equivalent of [`TitleFilter::matches`] for backends that filter server-side.
    pub fn regex_pattern(&self) -> String {
        regex::escape(&self.needle)
    }
}

/// One page of the catalog, newest `publish_date` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub skip: u64,
    pub limit: u64,
    pub filter: Option<TitleFilter>,
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Short backend label used in health responses and logs.
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Idempotent insert. A duplicate id must come back as `Ok(InsertOutcome::Duplicate)`.
    async fn insert(&self, video: &Video) -> Result<InsertOutcome, StoreError>;

    async fn find_page(&self, query: &PageQuery) -> Result<Vec<Video>, StoreError>;

    async fn count(&self, filter: Option<&TitleFilter>) -> Result<u64, StoreError>;
}
