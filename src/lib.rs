// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod catalog;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

pub use crate::api::{router, AppState};
use crate::config::{AppConfig, StoreBackend};
use crate::ingest::providers::youtube::YouTubeProvider;
use crate::ingest::{IngestDriver, KeyRotator, StatusHandle, TopicScheduler, VideoFetcher};
use crate::store::{InMemoryStore, MongoStore, VideoStore};

/// Everything the binary needs: router state plus the (not yet started) ingest loop.
pub struct Service {
    pub state: AppState,
    pub driver: Option<IngestDriver>,
}

pub async fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn VideoStore>> {
    match &cfg.store {
        StoreBackend::Mongo {
            uri,
            database,
            collection,
        } => {
            let store = MongoStore::connect(uri, database, collection, cfg.store_timeout).await?;
            // Reads still work without the index, just slower; don't block startup on it.
            if let Err(e) = store.ensure_indexes().await {
                warn!(target: "store", error = %e, "could not ensure publish_date index");
            }
            info!(target: "store", %database, %collection, "using MongoDB catalog");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!(target: "store", "using in-memory catalog; contents are lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

/// Built-in topics unless a topics file is configured; a configured file must load.
pub fn load_topics(cfg: &AppConfig) -> anyhow::Result<TopicScheduler> {
    match &cfg.topics_path {
        Some(path) => {
            let topics = ingest::config::load_topics(path)?;
            info!(target: "ingest", count = topics.topics().len(), path = %path.display(), "loaded topics file");
            Ok(topics)
        }
        None => Ok(TopicScheduler::default()),
    }
}

/// Wire store, fetcher, router state and ingest driver from configuration.
pub async fn build_service(cfg: &AppConfig) -> anyhow::Result<Service> {
    let store = open_store(cfg).await?;
    let rotator = Arc::new(KeyRotator::new(cfg.api_keys.iter().cloned())?);
    let provider = Arc::new(
        YouTubeProvider::new(cfg.api_base.clone(), cfg.fetch_timeout)
            .context("building YouTube client")?,
    );
    let fetcher = Arc::new(VideoFetcher::new(provider, Arc::clone(&rotator), Arc::clone(&store)));

    let (driver, status) = if cfg.ingest_enabled {
        let driver = IngestDriver::new(Arc::clone(&fetcher), load_topics(cfg)?, cfg.scheduler);
        let status = driver.status();
        (Some(driver), status)
    } else {
        info!(target: "ingest", "background ingest disabled");
        (None, StatusHandle::new(rotator))
    };

    let state = AppState::new(
        store,
        fetcher,
        status,
        &cfg.manual_fetch_topic,
        cfg.scheduler.cycle_timeout,
    );
    Ok(Service { state, driver })
}
