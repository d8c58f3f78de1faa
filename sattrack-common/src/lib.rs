pub mod types;
pub mod view;

pub use types::{Position, Visibility};
pub use view::{
    BaseMap, CameraIntent, CameraMode, EventSource, IconVariant, MapCommand, MarkerRenderState,
    UiEvent, ZoomLevel,
};
