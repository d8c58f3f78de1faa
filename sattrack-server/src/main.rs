use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use sattrack_backend::config;
use sattrack_backend::logging;
use sattrack_backend::module::feed::FeedClient;
use sattrack_backend::module::session::Session;
use sattrack_backend::module::view::BroadcastMapView;

mod routes;
use routes::AppState;

const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::read_config(config::DEFAULT_CONFIG_PATH)?;

    let _logging_guard = logging::init_logging("logs", "sattrack-server", &config.log_level)?;
    info!("Loaded configuration: {:?}", config);

    // Validate marker icons are in place
    let icon_path = PathBuf::from(&config.server.icon_directory);
    let missing = routes::missing_icons(&icon_path);
    if !missing.is_empty() {
        error!("Icon directory {} lacks {:?}", config.server.icon_directory, missing);
        anyhow::bail!("Missing marker icons in {}: {}", config.server.icon_directory, missing.join(", "));
    }

    let (commands, _) = broadcast::channel(COMMAND_CHANNEL_CAPACITY);
    let feed = Arc::new(FeedClient::new(&config.feed)?);
    let session = Session::start(&config, feed, BroadcastMapView::new(commands.clone()));

    let state = Arc::new(AppState {
        session: session.handle(),
        commands,
    });
    let app = routes::router(state, &config.server);

    let addr = config.server.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Starting map bridge on http://{}", addr);
    info!("Map commands: http://{}/commands (SSE), UI events: POST http://{}/events", addr, addr);

    // SSE clients never hang up on their own, so shut down on the signal
    // instead of waiting for connections to drain.
    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                error!("Map bridge server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    session.shutdown().await;

    Ok(())
}
