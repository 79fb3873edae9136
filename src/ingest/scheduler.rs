// src/ingest/scheduler.rs
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ingest::fetcher::{FetchReport, VideoFetcher};
use crate::ingest::rotator::KeyRotator;
use crate::ingest::topics::TopicScheduler;
use crate::ingest::types::FetchError;

#[derive(Clone, Copy, Debug)]
pub struct IngestSchedulerCfg {
    /// Pause between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Upper bound for a whole cycle (search plus all store calls).
    pub cycle_timeout: Duration,
}

impl Default for IngestSchedulerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            cycle_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    Idle,
    Fetching,
}

/// Snapshot served by `/ingest/status`. Never carries key material, only the index.
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatus {
    pub state: DriverState,
    pub cycles: u64,
    pub failures: u64,
    pub last_topic: Option<String>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_report: Option<FetchReport>,
    pub last_error: Option<String>,
    pub active_key_index: usize,
    pub key_count: usize,
}

#[derive(Debug, Clone)]
struct StatusInner {
    state: DriverState,
    cycles: u64,
    failures: u64,
    last_topic: Option<String>,
    last_cycle_at: Option<DateTime<Utc>>,
    last_report: Option<FetchReport>,
    last_error: Option<String>,
}

/// Shared view of the driver's progress, cheap to clone into request handlers.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<StatusInner>>,
    rotator: Arc<KeyRotator>,
}

impl StatusHandle {
    pub fn new(rotator: Arc<KeyRotator>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusInner {
                state: DriverState::Idle,
                cycles: 0,
                failures: 0,
                last_topic: None,
                last_cycle_at: None,
                last_report: None,
                last_error: None,
            })),
            rotator,
        }
    }

    pub fn snapshot(&self) -> IngestStatus {
        let s = self.inner.read().unwrap_or_else(PoisonError::into_inner).clone();
        IngestStatus {
            state: s.state,
            cycles: s.cycles,
            failures: s.failures,
            last_topic: s.last_topic,
            last_cycle_at: s.last_cycle_at,
            last_report: s.last_report,
            last_error: s.last_error,
            active_key_index: self.rotator.index(),
            key_count: self.rotator.len(),
        }
    }

    fn begin(&self, topic: &str) {
        let mut s = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        s.state = DriverState::Fetching;
        s.cycles += 1;
        s.last_topic = Some(topic.to_string());
    }

    fn finish(&self, outcome: &Result<FetchReport, FetchError>) {
        let mut s = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        s.state = DriverState::Idle;
        s.last_cycle_at = Some(Utc::now());
        match outcome {
            Ok(report) => {
                s.last_report = Some(report.clone());
                s.last_error = None;
            }
            Err(e) => {
                s.failures += 1;
                s.last_error = Some(e.to_string());
            }
        }
    }
}

/// Runs one fetch cycle, abandoning it once `timeout` elapses.
pub async fn run_bounded(
    fetcher: &VideoFetcher,
    topic: &str,
    timeout: Duration,
) -> Result<FetchReport, FetchError> {
    match tokio::time::timeout(timeout, fetcher.fetch_and_store(topic)).await {
        Ok(res) => res,
        Err(_) => Err(FetchError::CycleTimeout(timeout)),
    }
}

/// The perpetual topic → fetch → store loop.
///
/// Idle → Fetching when a cycle starts, Fetching → Idle when it ends however it
/// ends. Errors are logged and counted here and never stop the loop. Shutdown is
/// only observed while idle, so an in-flight cycle always runs to completion.
pub struct IngestDriver {
    fetcher: Arc<VideoFetcher>,
    topics: TopicScheduler,
    cfg: IngestSchedulerCfg,
    status: StatusHandle,
}

impl IngestDriver {
    pub fn new(fetcher: Arc<VideoFetcher>, topics: TopicScheduler, cfg: IngestSchedulerCfg) -> Self {
        let status = StatusHandle::new(fetcher.rotator_handle());
        Self {
            fetcher,
            topics,
            cfg,
            status,
        }
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub async fn run_cycle(&self, topic: &str) -> Result<FetchReport, FetchError> {
        crate::ingest::ensure_metrics_described();
        counter!("ingest_cycles_total").increment(1);
        self.status.begin(topic);

        let outcome = run_bounded(&self.fetcher, topic, self.cfg.cycle_timeout).await;

        if let Err(e) = &outcome {
            counter!("ingest_cycle_failures_total").increment(1);
            tracing::warn!(target: "ingest", topic, kind = e.kind(), error = %e, "cycle abandoned");
        }
        gauge!("ingest_last_cycle_ts").set(Utc::now().timestamp() as f64);
        self.status.finish(&outcome);
        outcome
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            target: "ingest",
            topics = self.topics.topics().len(),
            interval_ms = self.cfg.interval.as_millis() as u64,
            "ingest loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let topic = self.topics.next_topic().to_string();
            tracing::info!(target: "ingest", %topic, "fetching videos");
            let _ = self.run_cycle(&topic).await;

            if self.idle(&mut shutdown).await {
                break;
            }
        }
        tracing::info!(target: "ingest", "ingest loop stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sleeps for the interval. Returns `true` if shutdown was requested meanwhile.
    async fn idle(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let sleep = tokio::time::sleep(self.cfg.interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                res = shutdown.changed() => match res {
                    Ok(()) if *shutdown.borrow_and_update() => return true,
                    Ok(()) => continue,
                    // Sender gone: nobody can ask us to stop any more, keep pacing.
                    Err(_) => {
                        (&mut sleep).await;
                        return false;
                    }
                },
            }
        }
    }
}
