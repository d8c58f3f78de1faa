use std::sync::Arc;

use anyhow::Result;

use sattrack_backend::config;
use sattrack_backend::logging;
use sattrack_backend::module::feed::FeedClient;
use sattrack_backend::module::panels;
use sattrack_backend::module::session::Session;
use sattrack_backend::module::view::LoggingMapView;

#[tokio::main]
async fn main() -> Result<()> {
    // Invalid configuration is fatal before anything starts polling
    let config = config::read_config(config::DEFAULT_CONFIG_PATH)?;

    let _logging_guard = logging::init_logging("logs", "sattrack-backend", &config.log_level)?;

    tracing::info!("Sattrack backend starting (headless map)...");
    tracing::info!(
        "Polling {} every {} ms",
        config.feed.url,
        config.feed.poll_interval_ms
    );

    let feed = Arc::new(FeedClient::new(&config.feed)?);
    let session = Session::start(&config, feed, LoggingMapView::default());

    let handle = session.handle();
    let panel_logger = panels::spawn_panel_logger(handle.store(), handle.stats());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received.");

    panel_logger.abort();
    session.shutdown().await;

    Ok(())
}
