// src/config/mod.rs
//! Process configuration, read once at startup from the environment (`.env` in dev).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::ingest::providers::youtube::DEFAULT_API_BASE;
use crate::ingest::IngestSchedulerCfg;
use crate::store::mongo::{DEFAULT_COLLECTION, DEFAULT_DATABASE};

pub const ENV_MONGO_URI: &str = "MONGO_URI";
pub const ENV_MONGO_DB: &str = "MONGO_DB";
pub const ENV_MONGO_COLLECTION: &str = "MONGO_COLLECTION";
pub const ENV_CATALOG_STORE: &str = "CATALOG_STORE";
pub const ENV_API_KEYS: &str = "YOUTUBE_API_KEYS";
pub const ENV_API_BASE: &str = "YOUTUBE_API_BASE";
pub const ENV_INGEST_ENABLED: &str = "INGEST_ENABLED";
pub const ENV_INGEST_INTERVAL_SECS: &str = "INGEST_INTERVAL_SECS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_CYCLE_TIMEOUT_SECS: &str = "CYCLE_TIMEOUT_SECS";
pub const ENV_STORE_TIMEOUT_SECS: &str = "STORE_TIMEOUT_SECS";
pub const ENV_MANUAL_FETCH_TOPIC: &str = "MANUAL_FETCH_TOPIC";
pub const ENV_TOPICS_PATH: &str = "INGEST_TOPICS_PATH";

pub const DEFAULT_MANUAL_FETCH_TOPIC: &str = "football";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo {
        uri: String,
        database: String,
        collection: String,
    },
    /// Process-local, lost on restart. Dev and demo runs only.
    Memory,
}

#[derive(Clone)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub store_timeout: Duration,
    pub api_keys: Vec<String>,
    pub api_base: String,
    pub fetch_timeout: Duration,
    pub ingest_enabled: bool,
    pub scheduler: IngestSchedulerCfg,
    pub manual_fetch_topic: String,
    /// Replaces the built-in topic list when set.
    pub topics_path: Option<PathBuf>,
}

impl fmt::Debug for AppConfig {
    // The Mongo URI may embed credentials and the API keys are secrets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = match &self.store {
            StoreBackend::Mongo {
                database,
                collection,
                ..
            } => format!("mongo({database}.{collection})"),
            StoreBackend::Memory => "memory".to_string(),
        };
        f.debug_struct("AppConfig")
            .field("store", &store)
            .field("store_timeout", &self.store_timeout)
            .field("api_keys", &self.api_keys.len())
            .field("api_base", &self.api_base)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("ingest_enabled", &self.ingest_enabled)
            .field("scheduler", &self.scheduler)
            .field("manual_fetch_topic", &self.manual_fetch_topic)
            .field("topics_path", &self.topics_path)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads through `get`, so tests need not touch the process env.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_keys: Vec<String> = non_empty(ENV_API_KEYS)
            .unwrap_or_default()
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if api_keys.is_empty() {
            bail!("{ENV_API_KEYS} must list at least one comma-separated API key");
        }

        let store = match non_empty(ENV_CATALOG_STORE)
            .unwrap_or_else(|| "mongo".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "mongo" | "mongodb" => StoreBackend::Mongo {
                uri: non_empty(ENV_MONGO_URI)
                    .ok_or_else(|| anyhow!("{ENV_MONGO_URI} is required for the mongo store"))?,
                database: non_empty(ENV_MONGO_DB).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                collection: non_empty(ENV_MONGO_COLLECTION)
                    .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            },
            "memory" => StoreBackend::Memory,
            other => bail!("unsupported {ENV_CATALOG_STORE}: {other}"),
        };

        let secs = |name: &str, default: u64| -> Result<Duration> {
            match non_empty(name) {
                None => Ok(Duration::from_secs(default)),
                Some(raw) => {
                    let v: u64 = raw
                        .parse()
                        .with_context(|| format!("{name} must be a whole number of seconds"))?;
                    if v == 0 {
                        bail!("{name} must be > 0");
                    }
                    Ok(Duration::from_secs(v))
                }
            }
        };

        let ingest_enabled = match non_empty(ENV_INGEST_ENABLED) {
            None => true,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| anyhow!("{ENV_INGEST_ENABLED} must be true/false, got {raw}"))?,
        };

        Ok(Self {
            store,
            store_timeout: secs(ENV_STORE_TIMEOUT_SECS, 5)?,
            api_keys,
            api_base: non_empty(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            fetch_timeout: secs(ENV_FETCH_TIMEOUT_SECS, 5)?,
            ingest_enabled,
            scheduler: IngestSchedulerCfg {
                interval: secs(ENV_INGEST_INTERVAL_SECS, 10)?,
                cycle_timeout: secs(ENV_CYCLE_TIMEOUT_SECS, 30)?,
            },
            manual_fetch_topic: non_empty(ENV_MANUAL_FETCH_TOPIC)
                .unwrap_or_else(|| DEFAULT_MANUAL_FETCH_TOPIC.to_string()),
            topics_path: non_empty(ENV_TOPICS_PATH).map(PathBuf::from),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
