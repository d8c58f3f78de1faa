//! HTTP bridge between the tracking session and browser map clients.
//!
//! Map commands go out as Server-Sent Events on `/commands`; UI events come
//! back as JSON on `/events`. A new command subscriber first receives a
//! snapshot of the current view, meant for it alone, then the live commands.

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use sattrack_backend::config::ServerConfig;
use sattrack_backend::module::session::SessionHandle;
use sattrack_common::{BaseMap, MapCommand, UiEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

pub struct AppState {
    pub session: SessionHandle,
    pub commands: broadcast::Sender<MapCommand>,
}

pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let cors = if server.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .route("/panels", get(panels))
        .route("/commands", get(command_stream))
        .route("/events", post(post_event))
        .nest_service("/icons", ServeDir::new(&server.icon_directory))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "running",
        "service": "sattrack-server",
        "version": env!("CARGO_PKG_VERSION"),
        "session": state.session.id().to_string(),
        "map_clients": state.commands.receiver_count(),
        "poll": state.session.stats().snapshot(),
    }))
}

async fn panels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.session.panels())
}

async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<UiEvent>,
) -> StatusCode {
    match state.session.send_event(event).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            warn!("Rejecting UI event {:?}: {}", event, e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Icon files the base maps need that are absent from `icon_directory`.
pub fn missing_icons(icon_directory: &Path) -> Vec<&'static str> {
    BaseMap::ALL
        .iter()
        .map(|base_map| base_map.icon().asset_name())
        .filter(|name| !icon_directory.join(name).is_file())
        .collect()
}

fn map_command_event(command: &MapCommand) -> Option<Event> {
    match Event::default().event("map_command").json_data(command) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Failed to encode map command: {}", e);
            None
        }
    }
}

async fn command_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let sender = state.commands.clone();
    let attached = state.session.attach(move || sender.subscribe()).await;
    debug!("Map client connected ({} total)", state.commands.receiver_count());

    let stream = async_stream::stream! {
        let (snapshot, mut commands) = match attached {
            Ok(attached) => attached,
            Err(e) => {
                warn!("Cannot attach new map client: {}", e);
                return;
            }
        };

        for command in &snapshot {
            if let Some(event) = map_command_event(command) {
                yield Ok(event);
            }
        }

        loop {
            match commands.recv().await {
                Ok(command) => {
                    if let Some(event) = map_command_event(&command) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Map client lagged, {} commands skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use chrono::Utc;
    use sattrack_backend::config::TrackerConfig;
    use sattrack_backend::module::feed::{FetchError, PositionFeed};
    use sattrack_backend::module::session::Session;
    use sattrack_backend::module::view::BroadcastMapView;
    use sattrack_common::{Position, Visibility};
    use tower::ServiceExt;

    struct FixedFeed;

    #[async_trait]
    impl PositionFeed for FixedFeed {
        async fn fetch_position(&self) -> Result<Position, FetchError> {
            Ok(Position {
                latitude: 51.5,
                longitude: -0.1,
                altitude_km: 408.0,
                velocity_kmh: 27_600.0,
                visibility: Visibility::Daylight,
                timestamp: Utc::now(),
            })
        }
    }

    fn app() -> (Session, Router) {
        let config = TrackerConfig::default();
        let (commands, _) = broadcast::channel(64);
        let session = Session::start(
            &config,
            Arc::new(FixedFeed),
            BroadcastMapView::new(commands.clone()),
        );
        let state = Arc::new(AppState {
            session: session.handle(),
            commands,
        });
        let router = router(state, &config.server);
        (session, router)
    }

    fn json_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (session, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_event_accepted() {
        let (session, app) = app();
        let response = app
            .oneshot(json_post("/events", r#"{"type":"centre_toggled","enabled":false}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_event_rejects_unknown_event() {
        let (session, app) = app();
        let response = app
            .oneshot(json_post("/events", r#"{"type":"rotate","degrees":90}"#))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_post_event_after_shutdown() {
        let (session, app) = app();
        session.shutdown().await;

        let response = app
            .oneshot(json_post("/events", r#"{"type":"zoom_control_changed","zoom":6}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_panels_json() {
        let (session, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/panels").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let panels: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(panels["status"].is_string());
        assert!(panels["latitude"].is_string());
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_stream_is_event_stream() {
        let (session, app) = app();
        let response = app
            .oneshot(Request::builder().uri("/commands").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        session.shutdown().await;
    }

    #[test]
    fn test_missing_icons() {
        assert!(missing_icons(Path::new("assets/icons")).is_empty());
        assert_eq!(
            missing_icons(Path::new("no-such-directory")),
            vec!["satellite-standard.svg", "satellite-high-contrast.svg"]
        );
    }

    #[tokio::test]
    async fn test_icons_are_served() {
        let (session, app) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/icons/satellite-high-contrast.svg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        session.shutdown().await;
    }
}
