use sattrack_common::{EventSource, IconVariant, MapCommand, ZoomLevel};
use tokio::sync::broadcast;

/// Receiver of one-way map commands.
///
/// Implementors only need [`MapView::dispatch`]; the named operations build
/// the matching [`MapCommand`].
pub trait MapView: Send {
    fn dispatch(&mut self, command: MapCommand);

    fn move_marker(&mut self, latitude: f64, longitude: f64, icon: IconVariant) {
        self.dispatch(MapCommand::MoveMarker {
            latitude,
            longitude,
            icon,
        });
    }

    fn set_view(&mut self, latitude: f64, longitude: f64, zoom: ZoomLevel, source: EventSource) {
        self.dispatch(MapCommand::SetView {
            latitude,
            longitude,
            zoom,
            source,
        });
    }

    fn set_zoom(&mut self, zoom: ZoomLevel, source: EventSource) {
        self.dispatch(MapCommand::SetZoom { zoom, source });
    }

    fn replace_tile_layer(&mut self, provider: &str) {
        self.dispatch(MapCommand::ReplaceTileLayer {
            provider: provider.to_string(),
        });
    }

    fn sync_zoom_control(&mut self, zoom: ZoomLevel) {
        self.dispatch(MapCommand::SyncZoomControl { zoom });
    }
}

/// Headless map: every command goes to the log.
#[derive(Debug, Default)]
pub struct LoggingMapView {
    dispatched: u64,
}

impl LoggingMapView {
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl MapView for LoggingMapView {
    fn dispatch(&mut self, command: MapCommand) {
        self.dispatched += 1;
        match &command {
            MapCommand::MoveMarker { latitude, longitude, icon } => {
                tracing::info!("Marker -> {:.4}, {:.4} ({:?})", latitude, longitude, icon);
            }
            MapCommand::SetView { latitude, longitude, zoom, .. } => {
                tracing::info!("Camera -> {:.4}, {:.4} @ zoom {}", latitude, longitude, zoom);
            }
            other => tracing::info!("Map command: {:?}", other),
        }
    }
}

/// Fans commands out to every connected map client.
#[derive(Debug, Clone)]
pub struct BroadcastMapView {
    commands: broadcast::Sender<MapCommand>,
}

impl BroadcastMapView {
    pub fn new(commands: broadcast::Sender<MapCommand>) -> Self {
        Self { commands }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MapCommand> {
        self.commands.subscribe()
    }
}

impl MapView for BroadcastMapView {
    fn dispatch(&mut self, command: MapCommand) {
        if self.commands.send(command).is_err() {
            tracing::trace!("No map clients connected, command dropped");
        }
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingMapView {
    pub commands: Vec<MapCommand>,
}

#[cfg(test)]
impl RecordingMapView {
    /// Hand back everything recorded so far and start afresh.
    pub fn take(&mut self) -> Vec<MapCommand> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
impl MapView for RecordingMapView {
    fn dispatch(&mut self, command: MapCommand) {
        self.commands.push(command);
    }
}
