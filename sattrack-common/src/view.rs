//! Map view vocabulary shared by the controller and the map adapters.

use serde::{Deserialize, Serialize};

use crate::types::Position;

/// Zoom level accepted by the map, clamped to `[MIN, MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 18;
    pub const DEFAULT: ZoomLevel = ZoomLevel(4);

    /// Exact constructor; `None` outside `[MIN, MAX]`.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(ZoomLevel(level))
    }

    pub fn clamped(level: u8) -> Self {
        ZoomLevel(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for ZoomLevel {
    fn from(level: u8) -> Self {
        ZoomLevel::clamped(level)
    }
}

impl From<ZoomLevel> for u8 {
    fn from(zoom: ZoomLevel) -> Self {
        zoom.0
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker icon variant, chosen per base map for contrast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconVariant {
    /// Dark marker for light vector tiles
    Standard,
    /// Bright outlined marker for satellite imagery
    HighContrast,
}

impl IconVariant {
    /// Rendered icon size in pixels.
    pub const SIZE: (u32, u32) = (48, 48);
    /// Hot-spot inside the icon: its visual centre.
    pub const ANCHOR: (u32, u32) = (Self::SIZE.0 / 2, Self::SIZE.1 / 2);

    pub fn asset_name(&self) -> &'static str {
        match self {
            IconVariant::Standard => "satellite-standard.svg",
            IconVariant::HighContrast => "satellite-high-contrast.svg",
        }
    }
}

/// Base map choices offered by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BaseMap {
    #[default]
    #[serde(rename = "vector")]
    Vector,
    #[serde(rename = "satellite")]
    Satellite,
}

impl BaseMap {
    pub const ALL: [BaseMap; 2] = [BaseMap::Vector, BaseMap::Satellite];

    /// Tile provider identifier understood by the map widget.
    pub fn tile_provider(&self) -> &'static str {
        match self {
            BaseMap::Vector => "OpenStreetMap.Mapnik",
            BaseMap::Satellite => "Esri.WorldImagery",
        }
    }

    pub fn icon(&self) -> IconVariant {
        match self {
            BaseMap::Vector => IconVariant::Standard,
            BaseMap::Satellite => IconVariant::HighContrast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaseMap::Vector => "vector",
            BaseMap::Satellite => "satellite",
        }
    }
}

impl std::fmt::Display for BaseMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BaseMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" => Ok(BaseMap::Vector),
            "satellite" => Ok(BaseMap::Satellite),
            _ => Err(format!("Unknown base map: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Camera recentres on every new position
    #[default]
    Following,
    /// Camera only moves from direct user gestures
    Free,
}

/// What the camera is supposed to be doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraIntent {
    pub mode: CameraMode,
    pub zoom: ZoomLevel,
}

/// Origin of a camera change.
///
/// Commands issued by the controller are tagged `Command`; the map adapter
/// echoes the tag back when it reports the resulting camera change, so the
/// controller never mistakes its own moves for user gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Gesture,
    Command,
}

/// Marker placement derived from the latest position and base map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerRenderState {
    pub latitude: f64,
    pub longitude: f64,
    pub icon: IconVariant,
}

impl MarkerRenderState {
    pub fn derive(position: &Position, base_map: BaseMap) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            icon: base_map.icon(),
        }
    }
}

/// One-way command sent to a map view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapCommand {
    MoveMarker {
        latitude: f64,
        longitude: f64,
        icon: IconVariant,
    },
    SetView {
        latitude: f64,
        longitude: f64,
        zoom: ZoomLevel,
        source: EventSource,
    },
    SetZoom {
        zoom: ZoomLevel,
        source: EventSource,
    },
    ReplaceTileLayer {
        provider: String,
    },
    /// Moves the zoom slider without touching the camera
    SyncZoomControl {
        zoom: ZoomLevel,
    },
}

impl MapCommand {
    /// True for commands that move the camera.
    pub fn is_camera_command(&self) -> bool {
        matches!(self, MapCommand::SetView { .. } | MapCommand::SetZoom { .. })
    }
}

/// Event reported by a map view or its controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// The map camera zoomed or panned; `source` tells gestures from command echoes
    MapZoomed { zoom: ZoomLevel, source: EventSource },
    ZoomControlChanged { zoom: ZoomLevel },
    BaseMapSelected { base_map: BaseMap },
    CentreToggled { enabled: bool },
}
