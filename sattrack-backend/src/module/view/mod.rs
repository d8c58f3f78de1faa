//! View-state reconciliation
//!
//! [`ViewController`] turns store updates and UI events into map commands;
//! [`MapView`] is the seam to whatever renders them.

pub mod controller;
pub mod map_view;

pub use controller::ViewController;
pub use map_view::{BroadcastMapView, LoggingMapView, MapView};

#[cfg(test)]
pub(crate) use map_view::RecordingMapView;
