//! Background job that reloads the tracker's marker snapshot.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use domain::services::MarkerStore;

use super::scheduler::{Job, JobFrequency};
use crate::tracker::ProximityTracker;

/// Picks up markers changed outside the tracker's own marker service.
pub struct RefreshMarkersJob {
    tracker: Arc<ProximityTracker>,
    store: Arc<dyn MarkerStore>,
    interval: Duration,
}

impl RefreshMarkersJob {
    pub fn new(tracker: Arc<ProximityTracker>, store: Arc<dyn MarkerStore>, interval: Duration) -> Self {
        Self {
            tracker,
            store,
            interval,
        }
    }
}

#[async_trait::async_trait]
impl Job for RefreshMarkersJob {
    fn name(&self) -> &'static str {
        "refresh_markers"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval.as_secs().max(1))
    }

    async fn execute(&self) -> Result<(), String> {
        let count = self
            .tracker
            .refresh_markers(self.store.as_ref())
            .await
            .map_err(|e| e.to_string())?;
        debug!(markers = count, "Marker snapshot reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::{Marker, PositionSample};
    use domain::services::MockNotificationSink;
    use domain::DomainError;

    use crate::location::ScriptedLocationProvider;
    use crate::tracker::TrackerSettings;

    struct FixedStore(Vec<Marker>);

    #[async_trait::async_trait]
    impl MarkerStore for FixedStore {
        async fn list_markers(&self) -> Result<Vec<Marker>, DomainError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl MarkerStore for BrokenStore {
        async fn list_markers(&self) -> Result<Vec<Marker>, DomainError> {
            Err(DomainError::Store("database is locked".to_string()))
        }
    }

    fn tracker() -> Arc<ProximityTracker> {
        let provider = Arc::new(ScriptedLocationProvider::new(PositionSample::new(
            58.0,
            56.0,
            Utc::now(),
        )));
        Arc::new(ProximityTracker::new(
            provider,
            Arc::new(MockNotificationSink::new()),
            TrackerSettings::default(),
        ))
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let tracker = tracker();
        let store = Arc::new(FixedStore(vec![
            Marker::new(1, 58.01, 56.11),
            Marker::new(2, 58.02, 56.12),
        ]));
        let job = RefreshMarkersJob::new(Arc::clone(&tracker), store, Duration::from_secs(30));

        assert_eq!(job.frequency(), JobFrequency::Seconds(30));
        job.execute().await.unwrap();

        let ids: Vec<i64> = tracker.markers().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_store_failure_keeps_previous_snapshot() {
        let tracker = tracker();
        tracker
            .set_markers(vec![Marker::new(9, 58.01, 56.11)])
            .await
            .unwrap();
        let job = RefreshMarkersJob::new(Arc::clone(&tracker), Arc::new(BrokenStore), Duration::from_secs(30));

        let result = job.execute().await;

        assert!(result.unwrap_err().contains("database is locked"));
        assert_eq!(tracker.markers().len(), 1);
    }
}
