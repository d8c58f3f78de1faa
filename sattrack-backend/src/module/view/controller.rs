//! Camera and marker reconciliation state machine.
//!
//! Two camera modes:
//!
//! - **Following**: every accepted position moves the marker and recentres
//!   the camera at the intended zoom.
//! - **Free**: positions only move the marker; the camera belongs to the user.
//!
//! # Feedback guard
//!
//! Every camera command leaves here tagged [`EventSource::Command`], and the
//! map adapter reports each camera change with the tag of whatever caused it.
//! Reports tagged `Command` are echoes of our own moves and never change
//! state. Only `Gesture` reports are treated as user input, and only in Free
//! mode. Camera state is never diffed to guess where a change came from.
//!
//! # Precedence
//!
//! Control-driven zoom wins over a stale gesture: once the centre control has
//! put the controller back into Following, gesture reports still in flight
//! from the Free period are ignored.
//!
//! The marker only moves forward in time: a position older than the newest
//! one already rendered is dropped, however late its notification arrives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sattrack_common::{
    BaseMap, CameraIntent, CameraMode, EventSource, MapCommand, MarkerRenderState, Position,
    UiEvent, ZoomLevel,
};
use tracing::{debug, info, trace};

use super::map_view::MapView;
use crate::module::store::PositionStore;

pub struct ViewController<M: MapView> {
    store: Arc<PositionStore>,
    map: M,
    intent: CameraIntent,
    base_map: BaseMap,
    /// Timestamp of the newest position handed to any map client
    rendered_at: Option<DateTime<Utc>>,
}

impl<M: MapView> ViewController<M> {
    pub fn new(store: Arc<PositionStore>, map: M, intent: CameraIntent, base_map: BaseMap) -> Self {
        Self {
            store,
            map,
            intent,
            base_map,
            rendered_at: None,
        }
    }

    pub fn intent(&self) -> CameraIntent {
        self.intent
    }

    pub fn base_map(&self) -> BaseMap {
        self.base_map
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// A new position was accepted by the store.
    pub fn on_position(&mut self, position: &Position) {
        if self.rendered_at.is_some_and(|t| position.timestamp < t) {
            trace!("Skipping position older than the rendered one ({})", position.timestamp);
            return;
        }

        self.place_marker(position);
        if self.intent.mode == CameraMode::Following {
            self.recentre(position);
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::CentreToggled { enabled } => self.on_centre_toggled(enabled),
            UiEvent::MapZoomed { zoom, source } => self.on_map_zoomed(zoom, source),
            UiEvent::ZoomControlChanged { zoom } => self.on_zoom_control(zoom),
            UiEvent::BaseMapSelected { base_map } => self.on_base_map_selected(base_map),
        }
    }

    /// The whole current view as commands, for one map client that just
    /// attached. Nothing is dispatched to the map.
    pub fn snapshot(&mut self) -> Vec<MapCommand> {
        let mut commands = vec![
            MapCommand::ReplaceTileLayer {
                provider: self.base_map.tile_provider().to_string(),
            },
            MapCommand::SyncZoomControl {
                zoom: self.intent.zoom,
            },
        ];

        let position = self.store.current();
        if let Some(position) = &position {
            let marker = MarkerRenderState::derive(position, self.base_map);
            commands.push(MapCommand::MoveMarker {
                latitude: marker.latitude,
                longitude: marker.longitude,
                icon: marker.icon,
            });
            self.mark_rendered(position);
        }

        match (self.intent.mode, position) {
            (CameraMode::Following, Some(position)) => commands.push(MapCommand::SetView {
                latitude: position.latitude,
                longitude: position.longitude,
                zoom: self.intent.zoom,
                source: EventSource::Command,
            }),
            (CameraMode::Following, None) => {}
            (CameraMode::Free, _) => commands.push(MapCommand::SetZoom {
                zoom: self.intent.zoom,
                source: EventSource::Command,
            }),
        }

        commands
    }

    fn on_centre_toggled(&mut self, enabled: bool) {
        if enabled {
            info!("Centre enabled, following satellite at zoom {}", self.intent.zoom);
            self.intent.mode = CameraMode::Following;
            if let Some(position) = self.store.current() {
                self.recentre(&position);
            }
        } else {
            info!("Centre disabled, camera is free");
            self.intent.mode = CameraMode::Free;
        }
    }

    fn on_map_zoomed(&mut self, zoom: ZoomLevel, source: EventSource) {
        match (source, self.intent.mode) {
            (EventSource::Command, _) => {
                trace!("Ignoring echo of our own camera command (zoom {})", zoom);
            }
            (EventSource::Gesture, CameraMode::Following) => {
                debug!("Ignoring zoom gesture while following (zoom {})", zoom);
            }
            (EventSource::Gesture, CameraMode::Free) => {
                if zoom != self.intent.zoom {
                    debug!("Zoom gesture: {} -> {}", self.intent.zoom, zoom);
                    self.intent.zoom = zoom;
                    self.map.sync_zoom_control(zoom);
                }
            }
        }
    }

    fn on_zoom_control(&mut self, zoom: ZoomLevel) {
        debug!("Zoom control set to {}", zoom);
        self.intent.zoom = zoom;

        match self.intent.mode {
            CameraMode::Following => {
                if let Some(position) = self.store.current() {
                    self.recentre(&position);
                }
            }
            CameraMode::Free => self.map.set_zoom(zoom, EventSource::Command),
        }
    }

    fn on_base_map_selected(&mut self, base_map: BaseMap) {
        if base_map == self.base_map {
            return;
        }

        info!("Base map changed: {} -> {}", self.base_map, base_map);
        self.base_map = base_map;
        self.map.replace_tile_layer(base_map.tile_provider());

        if let Some(position) = self.store.current() {
            self.place_marker(&position);
        }
    }

    fn place_marker(&mut self, position: &Position) {
        let marker = MarkerRenderState::derive(position, self.base_map);
        self.map.move_marker(marker.latitude, marker.longitude, marker.icon);
        self.mark_rendered(position);
    }

    fn mark_rendered(&mut self, position: &Position) {
        if self.rendered_at.is_none_or(|t| position.timestamp > t) {
            self.rendered_at = Some(position.timestamp);
        }
    }

    fn recentre(&mut self, position: &Position) {
        self.map.set_view(
            position.latitude,
            position.longitude,
            self.intent.zoom,
            EventSource::Command,
        );
    }
}
