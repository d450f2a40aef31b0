//! Domain services for GeoMarker.
//!
//! Services contain the proximity logic that operates on domain models.

pub mod coordinator;
pub mod distance;
pub mod engine;
pub mod marker_store;
pub mod notification;
pub mod proximity;
pub mod visit_ledger;

pub use coordinator::{NotificationCoordinator, Transition};
pub use distance::{distance_between, haversine_distance, EARTH_RADIUS_METERS};
pub use engine::{EngineSettings, ProximityEngine, ProximityOutcome};
pub use marker_store::MarkerStore;
pub use notification::{MockNotificationSink, NotificationSink, NotificationSinkError, SinkCall};
pub use proximity::{ProximityClassifier, DEFAULT_PROXIMITY_THRESHOLD_METERS};
pub use visit_ledger::{VisitLedger, DEFAULT_VISIT_COOLDOWN_SECS};
