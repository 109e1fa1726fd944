//! Background Refresher
//!
//! Keeps the cached trending list warm by calling the aggregator's live
//! trending path on a fixed interval. Runs are non-reentrant: while one run is
//! in flight, scheduled and manual triggers are skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::aggregator::TokenAggregator;

#[derive(Debug, Error, PartialEq)]
pub enum RefreshError {
    #[error("Refresher already started")]
    AlreadyStarted,
    #[error("Refresh interval must be positive")]
    InvalidInterval,
}

/// Refresher settings
#[derive(Debug, Clone, PartialEq)]
pub struct RefresherConfig {
    pub interval: Duration,
    pub trending_limit: usize,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3_600),
            trending_limit: 100,
        }
    }
}

/// Result of one guarded run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed { tokens: usize },
    /// Another run was already in flight
    Skipped,
}

/// Status snapshot of the refresher
#[derive(Debug, Clone)]
pub struct RefresherStatus {
    /// A run is in flight right now
    pub is_running: bool,
    /// The periodic schedule is active
    pub has_scheduler: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_count: Option<usize>,
}

/// Clears the busy flag when a run ends, including when its task is aborted
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BackgroundRefresher {
    aggregator: Arc<TokenAggregator>,
    config: RefresherConfig,
    busy: AtomicBool,
    scheduler: Mutex<Option<JoinHandle<()>>>,
    last_run: RwLock<Option<DateTime<Utc>>>,
    last_count: RwLock<Option<usize>>,
}

impl BackgroundRefresher {
    pub fn new(aggregator: Arc<TokenAggregator>, config: RefresherConfig) -> Self {
        Self {
            aggregator,
            config,
            busy: AtomicBool::new(false),
            scheduler: Mutex::new(None),
            last_run: RwLock::new(None),
            last_count: RwLock::new(None),
        }
    }

    /// Refresh the trending list unless a run is already in flight
    pub async fn run_once(&self) -> RefreshOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("Refresh already in progress, skipping");
            return RefreshOutcome::Skipped;
        }
        let _guard = BusyGuard(&self.busy);

        let started = Utc::now();
        tracing::info!(limit = self.config.trending_limit, "Refreshing trending tokens");

        let tokens = self
            .aggregator
            .refresh_trending_tokens(self.config.trending_limit)
            .await;
        let count = tokens.len();

        *self.last_run.write().await = Some(started);
        *self.last_count.write().await = Some(count);

        tracing::info!(
            tokens = count,
            elapsed_ms = (Utc::now() - started).num_milliseconds(),
            "Trending refresh complete"
        );
        RefreshOutcome::Completed { tokens: count }
    }

    /// Manual trigger; shares the guard with scheduled runs
    pub async fn trigger_manual(&self) -> RefreshOutcome {
        tracing::info!("Manual refresh triggered");
        self.run_once().await
    }

    /// Run once now, then every interval, on a background task
    pub async fn start(self: &Arc<Self>) -> Result<(), RefreshError> {
        if self.config.interval.is_zero() {
            return Err(RefreshError::InvalidInterval);
        }

        let mut scheduler = self.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(RefreshError::AlreadyStarted);
        }

        let refresher = Arc::clone(self);
        let interval = self.config.interval;
        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                // first tick completes immediately
                ticker.tick().await;
                refresher.run_once().await;
            }
        }));

        tracing::info!(interval_secs = interval.as_secs(), "Background refresher started");
        Ok(())
    }

    /// Cancel the schedule; an in-flight run is aborted with it
    pub async fn stop(&self) {
        if let Some(handle) = self.scheduler.lock().await.take() {
            handle.abort();
            tracing::info!("Background refresher stopped");
        }
    }

    pub async fn status(&self) -> RefresherStatus {
        let has_scheduler = self
            .scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished());

        RefresherStatus {
            is_running: self.busy.load(Ordering::Acquire),
            has_scheduler,
            last_run: *self.last_run.read().await,
            last_count: *self.last_count.read().await,
        }
    }
}
