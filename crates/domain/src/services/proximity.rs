//! Proximity classification of markers around a position.

use tracing::warn;

use crate::models::{Marker, PositionSample};
use crate::services::distance::haversine_distance;

/// Default radius in meters within which a marker is considered in zone.
pub const DEFAULT_PROXIMITY_THRESHOLD_METERS: f64 = 100.0;

/// Stateless filter selecting the markers near a position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityClassifier {
    threshold_meters: f64,
}

impl ProximityClassifier {
    pub fn new(threshold_meters: f64) -> Self {
        Self { threshold_meters }
    }

    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    /// Returns the markers whose distance from the sample is at most the
    /// threshold (inclusive).
    ///
    /// Markers with malformed coordinates are skipped.
    pub fn in_zone<'a>(&self, sample: &PositionSample, markers: &'a [Marker]) -> Vec<&'a Marker> {
        markers
            .iter()
            .filter(|marker| {
                if !marker.has_valid_coordinates() {
                    warn!(
                        marker_id = marker.id,
                        latitude = marker.latitude,
                        longitude = marker.longitude,
                        "Skipping marker with malformed coordinates"
                    );
                    return false;
                }

                let distance = haversine_distance(
                    sample.latitude,
                    sample.longitude,
                    marker.latitude,
                    marker.longitude,
                );
                distance <= self.threshold_meters
            })
            .collect()
    }
}

impl Default for ProximityClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_THRESHOLD_METERS)
    }
}
