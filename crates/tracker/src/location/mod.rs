//! Position sources feeding the proximity pipeline.
//!
//! A [`LocationProvider`] is the platform geolocation API. A
//! [`PositionSource`] turns either that provider (live) or a random walk
//! (simulated) into samples pushed through a [`SampleEmitter`]. Exactly one
//! source is active at a time.

mod live;
mod scripted;
mod simulated;

pub use live::LivePositionSource;
pub use scripted::ScriptedLocationProvider;
pub use simulated::{RandomWalk, SimulatedPositionSource, SimulationSettings};

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;

use domain::models::{PermissionStatus, PositionSample};

use crate::error::TrackerError;
use crate::tracker::PipelineCommand;

/// Desired accuracy of the platform location fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
}

/// Options for the provider's continuous-update mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    /// Minimum time between updates.
    pub time_interval: Duration,
    /// Minimum movement between updates.
    pub distance_interval_meters: f64,
    pub accuracy: LocationAccuracy,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            time_interval: Duration::from_millis(5000),
            distance_interval_meters: 10.0,
            accuracy: LocationAccuracy::Balanced,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LocationError {
    #[error("Location services are disabled")]
    ServicesDisabled,

    #[error("Location provider failure: {0}")]
    Provider(String),
}

/// Platform geolocation API.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn services_enabled(&self) -> bool;

    /// One-shot absolute position fix.
    async fn current_position(&self) -> Result<PositionSample, LocationError>;

    /// Subscribe to continuous updates. Dropping the receiver unsubscribes.
    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<PositionSample>, LocationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Simulated,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hands samples from one source run to the pipeline, tagged with the
/// generation that run was started under.
#[derive(Debug, Clone)]
pub struct SampleEmitter {
    tx: mpsc::Sender<PipelineCommand>,
    generation: u64,
    kind: SourceKind,
}

impl SampleEmitter {
    pub(crate) fn new(tx: mpsc::Sender<PipelineCommand>, generation: u64, kind: SourceKind) -> Self {
        Self {
            tx,
            generation,
            kind,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Push a sample. Returns false once the pipeline has shut down.
    pub async fn emit(&self, sample: PositionSample) -> bool {
        self.tx
            .send(PipelineCommand::Sample {
                generation: self.generation,
                kind: self.kind,
                sample,
            })
            .await
            .is_ok()
    }
}

/// A stream of position samples with start/stop control.
///
/// `stop` is idempotent and returns only after the source has finished
/// emitting.
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn start(&mut self, emitter: SampleEmitter) -> Result<(), TrackerError>;

    async fn stop(&mut self);

    fn is_running(&self) -> bool;
}
