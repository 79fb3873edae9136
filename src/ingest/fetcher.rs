// src/ingest/fetcher.rs
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use crate::ingest::normalize_video;
use crate::ingest::rotator::KeyRotator;
use crate::ingest::types::{FetchError, SearchProvider, SearchRequest};
use crate::store::{InsertOutcome, VideoStore};

/// What one `fetch_and_store` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchReport {
    pub topic: String,
    pub key_index: usize,
    /// Hits returned by the provider.
    pub fetched: usize,
    pub inserted: usize,
    /// Skipped by the existence check.
    pub already_present: usize,
    /// Lost the check-then-insert race; the store kept the first write.
    pub duplicates: usize,
    /// Hits without a usable id.
    pub dropped: usize,
    pub insert_failures: usize,
}

pub struct VideoFetcher {
    provider: Arc<dyn SearchProvider>,
    rotator: Arc<KeyRotator>,
    store: Arc<dyn VideoStore>,
}

impl VideoFetcher {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        rotator: Arc<KeyRotator>,
        store: Arc<dyn VideoStore>,
    ) -> Self {
        Self {
            provider,
            rotator,
            store,
        }
    }

    pub fn rotator(&self) -> &KeyRotator {
        &self.rotator
    }

    pub fn rotator_handle(&self) -> Arc<KeyRotator> {
        Arc::clone(&self.rotator)
    }

    /// Search `topic` with the active key and insert every hit the store has not seen.
    ///
    /// A quota failure rotates the key and abandons the cycle. Any other provider
    /// failure, or a store failure on the existence check, abandons the cycle
    /// without rotating. Failed inserts are counted and skipped.
    pub async fn fetch_and_store(&self, topic: &str) -> Result<FetchReport, FetchError> {
        let (key_index, api_key) = self.rotator.current();
        let request = SearchRequest::for_topic(topic);

        let items = match self.provider.search(&request, api_key).await {
            Ok(items) => items,
            Err(e) if e.is_quota() => {
                let next = self.rotator.advance_from(key_index);
                counter!("ingest_key_rotations_total").increment(1);
                tracing::warn!(
                    target: "ingest",
                    provider = self.provider.name(),
                    topic,
                    failed_key = key_index,
                    next_key = next,
                    error = %e,
                    "quota exhausted, rotating API key"
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let mut report = FetchReport {
            topic: topic.to_string(),
            key_index,
            fetched: items.len(),
            ..FetchReport::default()
        };
        if items.is_empty() {
            tracing::info!(target: "ingest", topic, "no videos found");
        }

        for raw in items {
            let Some(video) = normalize_video(raw) else {
                report.dropped += 1;
                continue;
            };

            if self.store.exists(&video.id).await? {
                report.already_present += 1;
                tracing::debug!(target: "ingest", id = %video.id, "video already stored");
                continue;
            }

            match self.store.insert(&video).await {
                Ok(InsertOutcome::Inserted) => {
                    report.inserted += 1;
                    tracing::debug!(target: "ingest", id = %video.id, title = %video.title, "inserted video");
                }
                Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    report.insert_failures += 1;
                    tracing::warn!(target: "ingest", id = %video.id, error = %e, "insert failed");
                }
            }
        }

        counter!("ingest_videos_inserted_total").increment(report.inserted as u64);
        counter!("ingest_videos_existing_total")
            .increment((report.already_present + report.duplicates) as u64);
        counter!("ingest_insert_failures_total").increment(report.insert_failures as u64);

        tracing::info!(
            target: "ingest",
            topic,
            fetched = report.fetched,
            inserted = report.inserted,
            already_present = report.already_present,
            duplicates = report.duplicates,
            insert_failures = report.insert_failures,
            "fetch complete"
        );
        Ok(report)
    }
}
