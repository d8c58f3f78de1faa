//! In-memory feed replaying a fixed script, for poller and session tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sattrack_common::{Position, Visibility};

use super::client::PositionFeed;
use super::types::FetchError;

pub(crate) struct ScriptedFeed {
    script: Mutex<VecDeque<Result<Position, FetchError>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(script: Vec<Result<Position, FetchError>>) -> Self {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(script: Vec<Result<Position, FetchError>>, delay: Duration) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionFeed for ScriptedFeed {
    async fn fetch_position(&self) -> Result<Position, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        next.unwrap_or_else(|| Err(FetchError::Unreachable("script exhausted".to_string())))
    }
}

pub(crate) fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_760_875_200 + seconds, 0).unwrap()
}

/// Fix at `latitude`/`longitude` measured `seconds` after a fixed epoch.
pub(crate) fn position(latitude: f64, longitude: f64, seconds: i64) -> Position {
    Position {
        latitude,
        longitude,
        altitude_km: 408.0,
        velocity_kmh: 27_600.0,
        visibility: Visibility::Daylight,
        timestamp: at(seconds),
    }
}
