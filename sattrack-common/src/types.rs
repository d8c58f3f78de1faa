use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Illumination state of the tracked satellite as reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[serde(rename = "daylight")]
    Daylight,
    #[serde(rename = "eclipsed")]
    Eclipsed,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Visibility {
    /// Map the feed's free-form visibility string; anything unrecognised is `Unknown`.
    pub fn from_feed(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "daylight" => Visibility::Daylight,
            "eclipsed" => Visibility::Eclipsed,
            _ => Visibility::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Daylight => "daylight",
            Visibility::Eclipsed => "eclipsed",
            Visibility::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fix of the tracked satellite.
///
/// Immutable once constructed; consumers clone it out of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
    /// Altitude above the ellipsoid in kilometres
    pub altitude_km: f64,
    /// Ground-relative velocity in km/h
    pub velocity_kmh: f64,
    pub visibility: Visibility,
    /// When the feed measured this fix
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// True when `self` was measured strictly after `other`.
    pub fn is_newer_than(&self, other: &Position) -> bool {
        self.timestamp > other.timestamp
    }
}
