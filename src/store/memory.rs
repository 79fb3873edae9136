// src/store/memory.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{InsertOutcome, PageQuery, StoreError, TitleFilter, Video, VideoStore};

/// Process-local catalog. Backs tests and `CATALOG_STORE=memory` dev runs.
///
/// Uniqueness comes from the map key, so concurrent inserts of the same id
/// resolve to exactly one `Inserted`.
#[derive(Debug)]
pub struct InMemoryStore {
    videos: RwLock<HashMap<String, Video>>,
    reachable: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn with_videos(videos: impl IntoIterator<Item = Video>) -> Self {
        let map = videos.into_iter().map(|v| (v.id.clone(), v)).collect();
        Self {
            videos: RwLock::new(map),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: every operation fails with `StoreError::Unavailable` while unset.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.videos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<Video> {
        self.videos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(
                "in-memory store marked unreachable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl VideoStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "In-memory store"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reachable()
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.check_reachable()?;
        let guard = self.videos.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.contains_key(id))
    }

    async fn insert(&self, video: &Video) -> Result<InsertOutcome, StoreError> {
        self.check_reachable()?;
        let mut guard = self.videos.write().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(&video.id) {
            return Ok(InsertOutcome::Duplicate);
        }
        guard.insert(video.id.clone(), video.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn find_page(&self, query: &PageQuery) -> Result<Vec<Video>, StoreError> {
        self.check_reachable()?;
        let guard = self.videos.read().unwrap_or_else(PoisonError::into_inner);

        let mut rows: Vec<&Video> = guard
            .values()
            .filter(|v| query.filter.as_ref().map_or(true, |f| f.matches(&v.title)))
            .collect();
        // Newest first; id as tie-breaker keeps paging stable.
        rows.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, filter: Option<&TitleFilter>) -> Result<u64, StoreError> {
        self.check_reachable()?;
        let guard = self.videos.read().unwrap_or_else(PoisonError::into_inner);
        let n = match filter {
            Some(f) => guard.values().filter(|v| f.matches(&v.title)).count(),
            None => guard.len(),
        };
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, title: &str, date: &str) -> Video {
        Video {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            publish_date: date.into(),
            thumbnail_url: format!("https://i.ytimg.com/vi/{id}/default.jpg"),
            channel_name: "Channel".into(),
        }
    }

    #[tokio::test]
    async fn second_insert_is_duplicate_and_keeps_first_write() {
        let store = InMemoryStore::new();
        let first = video("a", "First title", "2024-01-01T00:00:00Z");
        let mut second = first.clone();
        second.title = "Changed".into();

        assert_eq!(store.insert(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(&second).await.unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().title, "First title");
    }

    #[tokio::test]
    async fn find_page_sorts_newest_first_and_paginates() {
        let store = InMemoryStore::with_videos([
            video("old", "x", "2023-01-01T00:00:00Z"),
            video("new", "x", "2025-01-01T00:00:00Z"),
            video("mid", "x", "2024-01-01T00:00:00Z"),
        ]);
        let page = store
            .find_page(&PageQuery {
                skip: 1,
                limit: 5,
                filter: None,
            })
            .await
            .unwrap();
        let ids: Vec<_> = page.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["mid", "old"]);
    }

    #[tokio::test]
    async fn unreachable_store_reports_unavailable() {
        let store = InMemoryStore::new();
        store.set_reachable(false);
        let err = store.exists("a").await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.ping().await.is_err());

        store.set_reachable(true);
        assert!(store.ping().await.is_ok());
    }
}
