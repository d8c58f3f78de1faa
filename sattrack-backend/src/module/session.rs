//! Tracking session
//!
//! Owns everything that lives for one run: the position store, the poller
//! and the task driving the [`ViewController`]. The controller is moved into
//! that single task, which handles store notifications and UI events one at
//! a time, so a transition and the commands it emits are never interleaved
//! with another.
//!
//! A map client attaching mid-session gets a snapshot of the current view
//! through [`SessionHandle::attach`]; clients already attached are not
//! disturbed.

use std::sync::Arc;

use sattrack_common::{MapCommand, Position, UiEvent};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::feed::PositionFeed;
use super::panels::{self, DisplayPanels};
use super::poller::{PollStats, Poller};
use super::store::PositionStore;
use super::view::{MapView, ViewController};
use crate::config::TrackerConfig;

const EVENT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tracking session has ended")]
pub struct SessionClosed;

enum SessionEvent {
    Ui(UiEvent),
    Attach {
        subscribe: Box<dyn FnOnce() + Send>,
        snapshot: oneshot::Sender<Vec<MapCommand>>,
    },
}

/// Cloneable access to a running session for adapters (HTTP bridge, loggers).
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    events: mpsc::Sender<SessionEvent>,
    store: Arc<PositionStore>,
    stats: Arc<PollStats>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> Arc<PositionStore> {
        self.store.clone()
    }

    pub fn stats(&self) -> Arc<PollStats> {
        self.stats.clone()
    }

    /// Queue a UI event for the controller.
    pub async fn send_event(&self, event: UiEvent) -> Result<(), SessionClosed> {
        self.events
            .send(SessionEvent::Ui(event))
            .await
            .map_err(|_| SessionClosed)
    }

    /// Attach a new map client: returns the current view as commands along
    /// with whatever `subscribe` produced.
    ///
    /// `subscribe` runs on the controller task right after the snapshot is
    /// taken, so a subscription made there sees exactly the commands issued
    /// after it, with no gap and no overlap.
    pub async fn attach<T, F>(&self, subscribe: F) -> Result<(Vec<MapCommand>, T), SessionClosed>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (subscribed_tx, subscribed_rx) = oneshot::channel();
        let (snapshot_tx, snapshot_rx) = oneshot::channel();

        self.events
            .send(SessionEvent::Attach {
                subscribe: Box::new(move || {
                    let _ = subscribed_tx.send(subscribe());
                }),
                snapshot: snapshot_tx,
            })
            .await
            .map_err(|_| SessionClosed)?;

        let snapshot = snapshot_rx.await.map_err(|_| SessionClosed)?;
        let subscription = subscribed_rx.await.map_err(|_| SessionClosed)?;
        Ok((snapshot, subscription))
    }

    pub fn panels(&self) -> DisplayPanels {
        panels::render_current(&self.store, &self.stats)
    }
}

pub struct Session {
    handle: SessionHandle,
    poller: Poller,
    controller_task: JoinHandle<()>,
}

impl Session {
    /// Build the session and start polling. Must be called inside a Tokio runtime.
    pub fn start<M>(config: &TrackerConfig, feed: Arc<dyn PositionFeed>, map: M) -> Self
    where
        M: MapView + 'static,
    {
        let id = Uuid::now_v7();
        let store = Arc::new(PositionStore::new());
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let controller = ViewController::new(
            store.clone(),
            map,
            config.view.initial_intent(),
            config.view.default_base_map,
        );
        // Subscribe before the poller can publish anything.
        let controller_task = tokio::spawn(run_controller(
            id,
            controller,
            store.clone(),
            store.subscribe(),
            events_rx,
        ));

        let mut poller = Poller::new(feed, config.feed.poll_interval());
        let stats = poller.stats();
        let sink = store.clone();
        poller.start(move |result| match result {
            Ok(position) => {
                sink.update(position);
            }
            Err(e) => sink.record_error(e),
        });

        info!(session = %id, "Tracking session started");

        Self {
            handle: SessionHandle {
                id,
                events: events_tx,
                store,
                stats,
            },
            poller,
            controller_task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn id(&self) -> Uuid {
        self.handle.id
    }

    /// Stop polling and tear down the controller. Late fetch results are discarded.
    pub async fn shutdown(mut self) {
        info!(session = %self.handle.id, "Shutting down tracking session...");

        self.poller.stop();
        self.controller_task.abort();
        if let Err(e) = (&mut self.controller_task).await {
            if !e.is_cancelled() {
                warn!("Controller task ended abnormally: {}", e);
            }
        }

        info!(session = %self.handle.id, "Tracking session stopped");
    }
}

async fn run_controller<M: MapView>(
    id: Uuid,
    mut controller: ViewController<M>,
    store: Arc<PositionStore>,
    mut changes: broadcast::Receiver<Position>,
    mut events: mpsc::Receiver<SessionEvent>,
) {
    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(position) => controller.on_position(&position),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session = %id, "Controller lagged behind {} positions, catching up", skipped);
                    // The backlog is older than the store; drop it before catching up.
                    changes = changes.resubscribe();
                    if let Some(position) = store.current() {
                        controller.on_position(&position);
                    }
                }
                Err(RecvError::Closed) => break,
            },
            event = events.recv() => match event {
                Some(SessionEvent::Ui(event)) => {
                    debug!(session = %id, "UI event: {:?}", event);
                    controller.handle_event(event);
                }
                Some(SessionEvent::Attach { subscribe, snapshot }) => {
                    let commands = controller.snapshot();
                    subscribe();
                    let _ = snapshot.send(commands);
                }
                None => break,
            },
        }
    }

    debug!(session = %id, "Controller loop finished");
}
