//! GeoMarker tracker runtime.
//!
//! Wires the proximity engine to position sources, the marker database and
//! a notification sink.

pub mod config;
pub mod error;
pub mod jobs;
pub mod location;
pub mod logging;
pub mod markers;
pub mod tracker;

pub use error::TrackerError;
pub use markers::MarkerService;
pub use tracker::{ProximityTracker, TrackerSettings};
