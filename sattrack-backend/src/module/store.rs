//! Latest known position of the tracked satellite.
//!
//! Single writer (the poller), many readers. The stored value only moves
//! forward in time: a late response carrying an older timestamp never
//! overwrites a newer fix. Subscribers are told about actual changes through
//! a broadcast channel; the lock is never held while notifying.

use std::sync::{Mutex, MutexGuard};

use sattrack_common::Position;
use tokio::sync::broadcast;

use super::feed::FetchError;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Result of offering a position to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Stored and broadcast to subscribers
    Accepted,
    /// Same value as the stored one; nothing broadcast
    Unchanged,
    /// Older than the stored position; dropped
    OutOfOrder,
}

#[derive(Default)]
struct StoreState {
    latest: Option<Position>,
    last_fetch_error: Option<FetchError>,
}

pub struct PositionStore {
    state: Mutex<StoreState>,
    changes: broadcast::Sender<Position>,
}

impl PositionStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(StoreState::default()),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Receive every accepted position from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Position> {
        self.changes.subscribe()
    }

    /// Offer a freshly fetched position.
    pub fn update(&self, position: Position) -> UpdateOutcome {
        let outcome = {
            let mut state = self.lock();
            let outcome = match state.latest.as_ref() {
                Some(current) if current.is_newer_than(&position) => UpdateOutcome::OutOfOrder,
                Some(current) if *current == position => UpdateOutcome::Unchanged,
                _ => UpdateOutcome::Accepted,
            };

            if outcome != UpdateOutcome::OutOfOrder {
                state.last_fetch_error = None;
            }
            if outcome == UpdateOutcome::Accepted {
                state.latest = Some(position.clone());
            }
            outcome
        };

        match outcome {
            UpdateOutcome::Accepted => {
                // No subscribers is fine: readers can still poll `current()`.
                let _ = self.changes.send(position);
            }
            UpdateOutcome::OutOfOrder => {
                tracing::debug!(
                    "Dropping out-of-order position measured at {}",
                    position.timestamp
                );
            }
            UpdateOutcome::Unchanged => {}
        }

        outcome
    }

    /// Remember the most recent fetch failure; the stored position is kept.
    pub fn record_error(&self, error: FetchError) {
        self.lock().last_fetch_error = Some(error);
    }

    pub fn current(&self) -> Option<Position> {
        self.lock().latest.clone()
    }

    pub fn last_error(&self) -> Option<FetchError> {
        self.lock().last_fetch_error.clone()
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::feed::scripted::position;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_empty_store() {
        let store = PositionStore::new();
        assert!(store.current().is_none());
        assert!(store.last_error().is_none());
    }

    #[test]
    fn test_increasing_timestamps_keep_last() {
        let store = PositionStore::new();
        let fixes: Vec<_> = (0..5).map(|i| position(i as f64, -(i as f64), i)).collect();

        for fix in &fixes {
            assert_eq!(store.update(fix.clone()), UpdateOutcome::Accepted);
        }

        assert_eq!(store.current().as_ref(), fixes.last());
    }

    #[test]
    fn test_out_of_order_update_is_ignored() {
        let store = PositionStore::new();
        let newer = position(10.0, 20.0, 5);
        let older = position(-10.0, -20.0, 3);

        store.update(newer.clone());
        assert_eq!(store.update(older), UpdateOutcome::OutOfOrder);
        assert_eq!(store.current(), Some(newer));
    }

    #[test]
    fn test_equal_timestamp_different_value_is_accepted() {
        let store = PositionStore::new();
        store.update(position(1.0, 1.0, 7));
        let corrected = position(1.5, 1.0, 7);

        assert_eq!(store.update(corrected.clone()), UpdateOutcome::Accepted);
        assert_eq!(store.current(), Some(corrected));
    }

    #[test]
    fn test_notifies_only_on_change() {
        let store = PositionStore::new();
        let mut rx = store.subscribe();
        let fix = position(51.5, -0.1, 1);

        store.update(fix.clone());
        assert_eq!(store.update(fix.clone()), UpdateOutcome::Unchanged);
        store.update(position(0.0, 0.0, 0));

        assert_eq!(rx.try_recv().unwrap(), fix);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_error_retains_position() {
        let store = PositionStore::new();
        let fix = position(51.5, -0.1, 1);
        store.update(fix.clone());

        store.record_error(FetchError::Unreachable("timeout".to_string()));
        store.record_error(FetchError::Malformed("missing field `latitude`".to_string()));

        assert_eq!(store.current(), Some(fix));
        assert!(matches!(store.last_error(), Some(FetchError::Malformed(_))));

        store.update(position(51.6, -0.2, 2));
        assert!(store.last_error().is_none());
    }
}
