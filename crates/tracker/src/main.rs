use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use domain::models::PositionSample;
use domain::services::MockNotificationSink;
use geomarker_tracker::config::Config;
use geomarker_tracker::jobs::{JobScheduler, PoolMetricsJob, RefreshMarkersJob};
use geomarker_tracker::location::ScriptedLocationProvider;
use geomarker_tracker::logging::init_logging;
use geomarker_tracker::{MarkerService, ProximityTracker};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging)?;

    info!("Starting GeoMarker tracker v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    // No platform geolocation here: the provider holds the configured start
    // as its fix and the tracker runs in simulation mode.
    let provider = Arc::new(ScriptedLocationProvider::new(PositionSample::new(
        config.simulation.start_latitude,
        config.simulation.start_longitude,
        Utc::now(),
    )));
    let sink = Arc::new(MockNotificationSink::new());
    let tracker = Arc::new(ProximityTracker::new(
        provider,
        sink,
        config.tracker_settings(),
    ));

    let markers = MarkerService::new(pool.clone(), Arc::clone(&tracker));
    let count = markers.refresh_snapshot().await?;
    info!(markers = count, "Marker snapshot loaded");

    let mut scheduler = JobScheduler::new();
    scheduler.register(RefreshMarkersJob::new(
        Arc::clone(&tracker),
        Arc::new(markers.repository().clone()),
        config.marker_refresh_interval(),
    ));
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    if let Err(e) = tracker.start_simulation(None).await {
        error!(error = %e, "{}", e.user_message());
        return Err(e.into());
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    tracker.shutdown().await;
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(5)).await;
    pool.close().await;

    info!("GeoMarker tracker stopped");
    Ok(())
}
