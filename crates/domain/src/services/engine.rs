//! Proximity engine: classifier → visit ledger → notification coordinator.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{ActiveNotification, Marker, PositionSample};
use crate::services::coordinator::{NotificationCoordinator, Transition};
use crate::services::notification::NotificationSink;
use crate::services::proximity::{ProximityClassifier, DEFAULT_PROXIMITY_THRESHOLD_METERS};
use crate::services::visit_ledger::{VisitLedger, DEFAULT_VISIT_COOLDOWN_SECS};

/// Tunables of the proximity engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub threshold_meters: f64,
    pub cooldown: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            threshold_meters: DEFAULT_PROXIMITY_THRESHOLD_METERS,
            cooldown: Duration::seconds(DEFAULT_VISIT_COOLDOWN_SECS),
        }
    }
}

/// Result of processing one position sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityOutcome {
    pub captured_at: DateTime<Utc>,
    /// Markers currently within the threshold.
    pub in_zone: Vec<i64>,
    /// Subset of `in_zone` reported as new arrivals.
    pub newly_entered: Vec<i64>,
    pub transition: Transition,
}

/// Runs every position sample through classification, debounce and
/// notification.
///
/// Entry is driven by the debounced set while exit is driven by the raw
/// in-zone set, so leaving is felt immediately and arrivals are throttled.
#[derive(Debug)]
pub struct ProximityEngine {
    classifier: ProximityClassifier,
    ledger: VisitLedger,
    coordinator: NotificationCoordinator,
}

impl ProximityEngine {
    pub fn new(settings: EngineSettings, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            classifier: ProximityClassifier::new(settings.threshold_meters),
            ledger: VisitLedger::new(settings.cooldown),
            coordinator: NotificationCoordinator::new(sink),
        }
    }

    /// Process one sample against the current marker snapshot.
    ///
    /// The sample's capture time is the clock used for debouncing.
    pub async fn process(&mut self, sample: &PositionSample, markers: &[Marker]) -> ProximityOutcome {
        let now = sample.captured_at;
        let in_zone = self.classifier.in_zone(sample, markers);

        let (newly_entered, transition) = if in_zone.is_empty() {
            (Vec::new(), self.coordinator.clear().await)
        } else {
            let fresh = self.ledger.filter_new(&in_zone, now);
            let transition = self.coordinator.announce(&fresh, now).await;
            (fresh.iter().map(|m| m.id).collect(), transition)
        };

        let outcome = ProximityOutcome {
            captured_at: now,
            in_zone: in_zone.iter().map(|m| m.id).collect(),
            newly_entered,
            transition,
        };

        debug!(
            latitude = sample.latitude,
            longitude = sample.longitude,
            in_zone = ?outcome.in_zone,
            newly_entered = ?outcome.newly_entered,
            transition = %outcome.transition,
            "Position sample processed"
        );

        outcome
    }

    /// Cancel the outstanding notification, e.g. when tracking stops.
    ///
    /// Visit history is kept.
    pub async fn clear_notification(&mut self) -> Transition {
        self.coordinator.clear().await
    }

    /// Forget the visit history of a deleted marker.
    pub fn forget_marker(&mut self, marker_id: i64) -> bool {
        self.ledger.forget(marker_id)
    }

    /// Drop visit history for markers absent from the snapshot.
    pub fn retain_markers(&mut self, markers: &[Marker]) -> usize {
        self.ledger.retain_markers(markers)
    }

    pub fn active_notification(&self) -> Option<&ActiveNotification> {
        self.coordinator.active()
    }

    pub fn ledger(&self) -> &VisitLedger {
        &self.ledger
    }

    pub fn classifier(&self) -> &ProximityClassifier {
        &self.classifier
    }
}
