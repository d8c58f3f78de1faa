//! Fixed-cadence feed poller
//!
//! Fires every `interval`, independent of rendering. At most one fetch is in
//! flight: a tick that finds the previous fetch still pending is skipped,
//! never queued. Errors are handed to the callback like positions; the next
//! tick is the retry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use sattrack_common::Position;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::feed::{FetchError, PositionFeed};

/// Running counters for feed health
#[derive(Debug, Default)]
pub struct PollStats {
    successes: AtomicU64,
    failures: AtomicU64,
    skipped_ticks: AtomicU64,
    consecutive_failures: AtomicU64,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollStatsSnapshot {
    pub successes: u64,
    pub failures: u64,
    pub skipped_ticks: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
}

impl PollStats {
    fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        *self.last_success.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_skip(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PollStatsSnapshot {
        PollStatsSnapshot {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_success: *self.last_success.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

pub struct Poller {
    feed: Arc<dyn PositionFeed>,
    interval: Duration,
    /// Session liveness; results arriving after `stop()` are dropped
    alive: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    stats: Arc<PollStats>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn new(feed: Arc<dyn PositionFeed>, interval: Duration) -> Self {
        Self {
            feed,
            interval,
            alive: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(PollStats::default()),
            handle: None,
        }
    }

    pub fn stats(&self) -> Arc<PollStats> {
        self.stats.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start polling; the first fetch happens immediately.
    ///
    /// `on_result` runs on the fetch task, once per completed fetch, and only
    /// while the poller is live.
    pub fn start<F>(&mut self, on_result: F)
    where
        F: Fn(Result<Position, FetchError>) + Send + Sync + 'static,
    {
        if self.handle.is_some() {
            warn!("Poller already running, ignoring start");
            return;
        }

        info!("Starting feed poller (interval: {:?})", self.interval);
        self.alive.store(true, Ordering::SeqCst);

        let feed = self.feed.clone();
        let period = self.interval;
        let alive = self.alive.clone();
        let in_flight = self.in_flight.clone();
        let stats = self.stats.clone();
        let on_result = Arc::new(on_result);

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if !alive.load(Ordering::SeqCst) {
                    break;
                }

                if in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    stats.record_skip();
                    debug!("Previous fetch still in flight, skipping tick");
                    continue;
                }

                tokio::spawn(Self::fetch_once(
                    feed.clone(),
                    alive.clone(),
                    in_flight.clone(),
                    stats.clone(),
                    on_result.clone(),
                ));
            }
        }));
    }

    async fn fetch_once<F>(
        feed: Arc<dyn PositionFeed>,
        alive: Arc<AtomicBool>,
        in_flight: Arc<AtomicBool>,
        stats: Arc<PollStats>,
        on_result: Arc<F>,
    ) where
        F: Fn(Result<Position, FetchError>) + Send + Sync + 'static,
    {
        let result = feed.fetch_position().await;

        if alive.load(Ordering::SeqCst) {
            match &result {
                Ok(position) => {
                    stats.record_success();
                    debug!(
                        lat = format!("{:.4}", position.latitude),
                        lon = format!("{:.4}", position.longitude),
                        "Fetched position"
                    );
                }
                Err(e) => {
                    let consecutive = stats.record_failure();
                    warn!("Feed fetch failed ({} in a row): {}", consecutive, e);
                }
            }
            on_result(result);
        } else {
            debug!("Poller stopped, discarding late fetch result");
        }

        in_flight.store(false, Ordering::SeqCst);
    }

    /// Stop ticking. A fetch already in flight completes and is discarded.
    pub fn stop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Feed poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
