//! Common test utilities for integration tests.
//!
//! Trackers are built over a scripted location provider and the mock
//! notification sink; databases are in-memory SQLite.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use domain::models::PositionSample;
use domain::services::{MockNotificationSink, ProximityOutcome};
use geomarker_tracker::location::{ScriptedLocationProvider, SimulationSettings};
use geomarker_tracker::{ProximityTracker, TrackerSettings};
use persistence::db::{create_pool, run_migrations, DatabaseConfig};

/// Far enough from every test marker to be out of zone.
pub const AWAY: (f64, f64) = (58.03, 56.13);

/// Fixed timeline: `t(n)` is `n` seconds after an arbitrary origin.
pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn sample_at(latitude: f64, longitude: f64, secs: i64) -> PositionSample {
    PositionSample::new(latitude, longitude, t(secs))
}

pub struct TestTracker {
    pub tracker: Arc<ProximityTracker>,
    pub provider: Arc<ScriptedLocationProvider>,
    pub sink: Arc<MockNotificationSink>,
}

impl TestTracker {
    /// Tracker whose provider starts away from every marker at `t(0)`.
    pub fn new() -> Self {
        Self::with_sink(MockNotificationSink::new())
    }

    pub fn with_sink(sink: MockNotificationSink) -> Self {
        let provider = Arc::new(ScriptedLocationProvider::new(sample_at(AWAY.0, AWAY.1, 0)));
        let sink = Arc::new(sink);
        let settings = TrackerSettings {
            simulation: SimulationSettings {
                seed: Some(11),
                ..SimulationSettings::default()
            },
            ..TrackerSettings::default()
        };
        let tracker = Arc::new(ProximityTracker::new(
            provider.clone(),
            sink.clone(),
            settings,
        ));

        Self {
            tracker,
            provider,
            sink,
        }
    }
}

/// Wait for the next processed sample.
pub async fn next_outcome(rx: &mut broadcast::Receiver<ProximityOutcome>) -> ProximityOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for proximity outcome")
        .expect("outcome channel closed")
}

/// Create an in-memory database with the schema applied.
pub async fn create_test_pool() -> SqlitePool {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout_secs: 5,
    })
    .await
    .expect("Failed to create test pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
