//! Display panels: formatted text derived from the latest position.
//!
//! Panels own no state. On sustained feed failure the last good values stay
//! on screen and only the status line changes.

use std::sync::Arc;

use sattrack_common::Position;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::feed::FetchError;
use super::poller::PollStats;
use super::store::PositionStore;

const PLACEHOLDER: &str = "--";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPanels {
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub velocity: String,
    pub visibility: String,
    pub updated_at: String,
    pub status: String,
}

fn format_coordinate(value: f64, positive: char, negative: char) -> String {
    let hemisphere = if value < 0.0 { negative } else { positive };
    format!("{:.4}° {}", value.abs(), hemisphere)
}

pub fn format_latitude(latitude: f64) -> String {
    format_coordinate(latitude, 'N', 'S')
}

pub fn format_longitude(longitude: f64) -> String {
    format_coordinate(longitude, 'E', 'W')
}

/// Round to an integer and group thousands with commas: 27600.4 -> "27,600".
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn status_line(
    position: Option<&Position>,
    last_error: Option<&FetchError>,
    consecutive_failures: u64,
) -> String {
    match (position, last_error) {
        (None, None) => "waiting for first position".to_string(),
        (None, Some(e)) => format!("waiting for first position (last error: {})", e),
        (Some(_), Some(e)) if consecutive_failures > 0 => {
            format!("stale ({} consecutive failures: {})", consecutive_failures, e)
        }
        (Some(_), _) => "live".to_string(),
    }
}

/// Render the panels for the given state.
pub fn render(
    position: Option<&Position>,
    last_error: Option<&FetchError>,
    consecutive_failures: u64,
) -> DisplayPanels {
    let status = status_line(position, last_error, consecutive_failures);

    match position {
        Some(p) => DisplayPanels {
            latitude: format_latitude(p.latitude),
            longitude: format_longitude(p.longitude),
            altitude: format!("{:.2} km", p.altitude_km),
            velocity: format!("{} km/h", format_thousands(p.velocity_kmh)),
            visibility: p.visibility.to_string(),
            updated_at: p.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            status,
        },
        None => DisplayPanels {
            latitude: PLACEHOLDER.to_string(),
            longitude: PLACEHOLDER.to_string(),
            altitude: PLACEHOLDER.to_string(),
            velocity: PLACEHOLDER.to_string(),
            visibility: PLACEHOLDER.to_string(),
            updated_at: PLACEHOLDER.to_string(),
            status,
        },
    }
}

/// Render from the live store and poll counters.
pub fn render_current(store: &PositionStore, stats: &PollStats) -> DisplayPanels {
    let position = store.current();
    let last_error = store.last_error();
    render(
        position.as_ref(),
        last_error.as_ref(),
        stats.snapshot().consecutive_failures,
    )
}

/// Log the panels whenever the store accepts a new position.
pub fn spawn_panel_logger(store: Arc<PositionStore>, stats: Arc<PollStats>) -> JoinHandle<()> {
    let mut changes = store.subscribe();

    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    let panels = render_current(&store, &stats);
                    tracing::info!(
                        lat = %panels.latitude,
                        lon = %panels.longitude,
                        alt = %panels.altitude,
                        vel = %panels.velocity,
                        visibility = %panels.visibility,
                        "Position {}",
                        panels.updated_at
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::feed::scripted::position;
    use sattrack_common::Visibility;

    #[test]
    fn test_format_coordinates() {
        assert_eq!(format_latitude(51.5), "51.5000° N");
        assert_eq!(format_latitude(-33.86791), "33.8679° S");
        assert_eq!(format_longitude(-0.1), "0.1000° W");
        assert_eq!(format_longitude(151.2), "151.2000° E");
        assert_eq!(format_latitude(0.0), "0.0000° N");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(27600.0), "27,600");
        assert_eq!(format_thousands(27599.6), "27,600");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1_234_567.0), "1,234,567");
        assert_eq!(format_thousands(-4500.0), "-4,500");
        assert_eq!(format_thousands(0.0), "0");
    }

    #[test]
    fn test_render_reference_position() {
        let mut fix = position(51.5, -0.1, 0);
        fix.visibility = Visibility::Eclipsed;

        let panels = render(Some(&fix), None, 0);
        assert_eq!(panels.latitude, "51.5000° N");
        assert_eq!(panels.longitude, "0.1000° W");
        assert_eq!(panels.altitude, "408.00 km");
        assert_eq!(panels.velocity, "27,600 km/h");
        assert_eq!(panels.visibility, "eclipsed");
        assert!(panels.updated_at.ends_with("UTC"));
        assert_eq!(panels.status, "live");
    }

    #[test]
    fn test_render_without_position() {
        let panels = render(None, None, 0);
        assert_eq!(panels.latitude, PLACEHOLDER);
        assert_eq!(panels.status, "waiting for first position");

        let err = FetchError::Unreachable("dns".to_string());
        let panels = render(None, Some(&err), 3);
        assert!(panels.status.contains("dns"));
    }

    #[test]
    fn test_render_stale_keeps_last_values() {
        let fix = position(10.0, 20.0, 0);
        let err = FetchError::Malformed("missing field `velocity`".to_string());

        let panels = render(Some(&fix), Some(&err), 2);
        assert_eq!(panels.latitude, "10.0000° N");
        assert!(panels.status.starts_with("stale (2 consecutive failures"));
    }

    #[test]
    fn test_render_current_reads_store() {
        let store = PositionStore::new();
        let stats = PollStats::default();
        store.update(position(1.0, 2.0, 0));

        let panels = render_current(&store, &stats);
        assert_eq!(panels.longitude, "2.0000° E");
        assert_eq!(panels.status, "live");
    }
}
