//! Proximity tracker runtime.
//!
//! A single consumer task owns the [`ProximityEngine`] and processes
//! pipeline commands in order, so the visit ledger and the active
//! notification have exactly one writer. Position sources push samples
//! tagged with a source generation; every stop bumps the generation so
//! samples still queued from a stopped source are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use validator::Validate;

use domain::models::{Coordinate, Marker, Permission, PositionSample};
use domain::services::{
    EngineSettings, MarkerStore, NotificationSink, ProximityEngine, ProximityOutcome, Transition,
};

use crate::error::TrackerError;
use crate::location::{
    LivePositionSource, LocationProvider, PositionSource, SampleEmitter, SimulatedPositionSource,
    SimulationSettings, SourceKind, WatchOptions,
};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const OUTCOME_BUFFER: usize = 64;

/// Messages processed by the consumer task.
#[derive(Debug)]
pub(crate) enum PipelineCommand {
    Sample {
        generation: u64,
        kind: SourceKind,
        sample: PositionSample,
    },
    /// Prune visit history to the given marker snapshot.
    RetainMarkers(Arc<Vec<Marker>>),
    ForgetMarker(i64),
    Clear {
        ack: oneshot::Sender<Transition>,
    },
    /// Publish a real position without running proximity checks.
    RestorePosition(PositionSample),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub engine: EngineSettings,
    pub watch: WatchOptions,
    pub simulation: SimulationSettings,
    pub channel_capacity: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            watch: WatchOptions::default(),
            simulation: SimulationSettings::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

struct Pipeline {
    engine: ProximityEngine,
    commands: mpsc::Receiver<PipelineCommand>,
    generation: Arc<AtomicU64>,
    markers: watch::Receiver<Arc<Vec<Marker>>>,
    position: watch::Sender<Option<PositionSample>>,
    real_position: watch::Sender<Option<PositionSample>>,
    outcomes: broadcast::Sender<ProximityOutcome>,
    /// Latest capture time seen for the current generation.
    watermark: Option<(u64, DateTime<Utc>)>,
}

impl Pipeline {
    async fn run(mut self) {
        info!("Proximity pipeline started");

        while let Some(command) = self.commands.recv().await {
            match command {
                PipelineCommand::Sample {
                    generation,
                    kind,
                    sample,
                } => self.handle_sample(generation, kind, sample).await,
                PipelineCommand::RetainMarkers(snapshot) => {
                    let pruned = self.engine.retain_markers(&snapshot);
                    if pruned > 0 {
                        debug!(pruned, "Pruned visit history for removed markers");
                    }
                }
                PipelineCommand::ForgetMarker(marker_id) => {
                    if self.engine.forget_marker(marker_id) {
                        debug!(marker_id, "Forgot visit history for marker");
                    }
                }
                PipelineCommand::Clear { ack } => {
                    let transition = self.engine.clear_notification().await;
                    record_transition(transition);
                    let _ = ack.send(transition);
                }
                PipelineCommand::RestorePosition(sample) => {
                    self.real_position.send_replace(Some(sample.clone()));
                    self.position.send_replace(Some(sample));
                }
                PipelineCommand::Shutdown => break,
            }
        }

        info!("Proximity pipeline stopped");
    }

    async fn handle_sample(&mut self, generation: u64, kind: SourceKind, sample: PositionSample) {
        let current = self.generation.load(Ordering::SeqCst);
        if generation != current {
            debug!(generation, current, "Discarding sample from stopped source");
            return;
        }

        if let Err(e) = sample.validate() {
            warn!(error = %e, source = %kind, "Discarding invalid position sample");
            return;
        }

        if let Some((seen_generation, latest)) = self.watermark {
            if seen_generation == generation && sample.captured_at < latest {
                debug!(
                    captured_at = %sample.captured_at,
                    latest = %latest,
                    "Discarding out-of-order sample"
                );
                return;
            }
        }
        self.watermark = Some((generation, sample.captured_at));

        if kind == SourceKind::Live {
            self.real_position.send_replace(Some(sample.clone()));
        }
        self.position.send_replace(Some(sample.clone()));

        let snapshot = self.markers.borrow().clone();
        let outcome = self.engine.process(&sample, &snapshot).await;

        counter!("proximity_samples_processed_total").increment(1);
        record_transition(outcome.transition);

        // No subscribers is fine.
        let _ = self.outcomes.send(outcome);
    }
}

fn record_transition(transition: Transition) {
    match transition {
        Transition::Raised => {
            counter!("proximity_notifications_shown_total").increment(1);
        }
        Transition::Replaced => {
            counter!("proximity_notifications_shown_total").increment(1);
            counter!("proximity_notifications_cancelled_total").increment(1);
        }
        Transition::Cleared => {
            counter!("proximity_notifications_cancelled_total").increment(1);
        }
        Transition::Failed => {
            counter!("proximity_sink_failures_total").increment(1);
        }
        Transition::Unchanged => {}
    }
}

/// Drives the proximity engine from one position source at a time.
pub struct ProximityTracker {
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn NotificationSink>,
    settings: TrackerSettings,
    commands: mpsc::Sender<PipelineCommand>,
    generation: Arc<AtomicU64>,
    markers: watch::Sender<Arc<Vec<Marker>>>,
    position: watch::Receiver<Option<PositionSample>>,
    real_position: watch::Receiver<Option<PositionSample>>,
    outcomes: broadcast::Sender<ProximityOutcome>,
    source: Mutex<Option<Box<dyn PositionSource>>>,
    consumer: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ProximityTracker {
    /// Create the tracker and spawn its consumer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn NotificationSink>,
        settings: TrackerSettings,
    ) -> Self {
        let (commands, command_rx) = mpsc::channel(settings.channel_capacity.max(1));
        let generation = Arc::new(AtomicU64::new(0));
        let (markers, markers_rx) = watch::channel(Arc::new(Vec::new()));
        let (position_tx, position) = watch::channel(None);
        let (real_position_tx, real_position) = watch::channel(None);
        let (outcomes, _) = broadcast::channel(OUTCOME_BUFFER);

        let pipeline = Pipeline {
            engine: ProximityEngine::new(settings.engine, Arc::clone(&sink)),
            commands: command_rx,
            generation: Arc::clone(&generation),
            markers: markers_rx,
            position: position_tx,
            real_position: real_position_tx,
            outcomes: outcomes.clone(),
            watermark: None,
        };
        let consumer = tokio::spawn(pipeline.run());

        Self {
            provider,
            sink,
            settings,
            commands,
            generation,
            markers,
            position,
            real_position,
            outcomes,
            source: Mutex::new(None),
            consumer: std::sync::Mutex::new(Some(consumer)),
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Receive the outcome of every processed sample.
    pub fn subscribe(&self) -> broadcast::Receiver<ProximityOutcome> {
        self.outcomes.subscribe()
    }

    /// Watch the displayed position (real or simulated).
    pub fn positions(&self) -> watch::Receiver<Option<PositionSample>> {
        self.position.clone()
    }

    pub fn current_position(&self) -> Option<PositionSample> {
        self.position.borrow().clone()
    }

    pub fn last_real_position(&self) -> Option<PositionSample> {
        self.real_position.borrow().clone()
    }

    /// Current marker snapshot.
    pub fn markers(&self) -> Arc<Vec<Marker>> {
        self.markers.borrow().clone()
    }

    /// Replace the marker snapshot.
    pub async fn set_markers(&self, markers: Vec<Marker>) -> Result<(), TrackerError> {
        let snapshot = Arc::new(markers);
        self.markers.send_replace(Arc::clone(&snapshot));
        self.send(PipelineCommand::RetainMarkers(snapshot)).await
    }

    /// Reload the marker snapshot from the store. Returns the marker count.
    pub async fn refresh_markers(&self, store: &dyn MarkerStore) -> Result<usize, TrackerError> {
        let markers = store.list_markers().await?;
        let count = markers.len();
        self.set_markers(markers).await?;
        debug!(markers = count, "Marker snapshot refreshed");
        Ok(count)
    }

    /// Drop the visit history of a deleted marker.
    pub async fn forget_marker(&self, marker_id: i64) -> Result<(), TrackerError> {
        self.send(PipelineCommand::ForgetMarker(marker_id)).await
    }

    /// Kind of the active position source, if any.
    pub async fn source_kind(&self) -> Option<SourceKind> {
        self.source.lock().await.as_ref().map(|s| s.kind())
    }

    pub async fn is_running(&self) -> bool {
        self.source
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_running())
    }

    /// Start tracking the real position.
    ///
    /// Requires location and notification permission and enabled location
    /// services. Any running source is stopped first.
    pub async fn start_live(&self) -> Result<(), TrackerError> {
        let mut slot = self.source.lock().await;

        self.ensure_permission(Permission::Location).await?;
        self.ensure_permission(Permission::Notifications).await?;

        if !self.provider.services_enabled().await {
            warn!("Location services are disabled");
            return Err(TrackerError::SourceUnavailable(
                "Location services are disabled".to_string(),
            ));
        }

        let initial = self.provider.current_position().await?;

        self.stop_source(&mut slot).await;

        // The initial fix only enters the pipeline once the watch is open.
        let emitter = self.next_emitter(SourceKind::Live);
        let mut source = LivePositionSource::new(Arc::clone(&self.provider), self.settings.watch);
        source.start(emitter.clone()).await?;

        if !emitter.emit(initial).await {
            source.stop().await;
            return Err(TrackerError::PipelineClosed);
        }
        *slot = Some(Box::new(source));

        info!("Live tracking started");
        Ok(())
    }

    /// Start a simulated walk.
    ///
    /// Without an explicit start the walk begins at the last known real
    /// position, then the provider's current fix, then the configured
    /// origin. Returns the start point used.
    pub async fn start_simulation(&self, start: Option<Coordinate>) -> Result<Coordinate, TrackerError> {
        let mut slot = self.source.lock().await;

        self.ensure_permission(Permission::Notifications).await?;

        if let Some(start) = start {
            if !shared::validation::is_valid_coordinate(start.latitude, start.longitude) {
                return Err(TrackerError::Validation(
                    "Simulation start coordinates are out of range".to_string(),
                ));
            }
        }

        self.stop_source(&mut slot).await;

        let start = match start {
            Some(start) => start,
            None => self.real_start().await,
        };

        let mut source = SimulatedPositionSource::new(self.settings.simulation.clone(), start);
        source.start(self.next_emitter(SourceKind::Simulated)).await?;
        *slot = Some(Box::new(source));

        info!(
            latitude = start.latitude,
            longitude = start.longitude,
            "Simulation started"
        );
        Ok(start)
    }

    /// Stop tracking.
    ///
    /// Idempotent. When this returns no further sample will be processed and
    /// the outstanding notification has been cancelled. Stopping a
    /// simulation restores the real position.
    pub async fn stop(&self) -> Result<(), TrackerError> {
        let mut slot = self.source.lock().await;
        let stopped = self.stop_source(&mut slot).await;

        if stopped == Some(SourceKind::Simulated) {
            self.restore_real_position().await?;
        }

        // Commands run in order, so the ack also covers the restore above.
        let (ack, done) = oneshot::channel();
        self.send(PipelineCommand::Clear { ack }).await?;
        let transition = done.await.map_err(|_| TrackerError::PipelineClosed)?;

        if let Some(kind) = stopped {
            info!(source = %kind, transition = %transition, "Tracking stopped");
        }
        Ok(())
    }

    /// Stop tracking and wait for the consumer task to exit.
    pub async fn shutdown(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Failed to stop tracking during shutdown");
        }
        let _ = self.commands.send(PipelineCommand::Shutdown).await;

        let consumer = self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = consumer {
            if let Err(e) = handle.await {
                warn!("Proximity pipeline task panicked: {}", e);
            }
        }
    }

    async fn send(&self, command: PipelineCommand) -> Result<(), TrackerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TrackerError::PipelineClosed)
    }

    async fn ensure_permission(&self, permission: Permission) -> Result<(), TrackerError> {
        let status = match permission {
            Permission::Location => self.provider.request_permission().await,
            Permission::Notifications => self.sink.request_permission().await,
        };

        if status.is_granted() {
            Ok(())
        } else {
            warn!(permission = %permission, status = ?status, "Permission not granted");
            Err(TrackerError::PermissionDenied(permission))
        }
    }

    /// Stop the active source, if any, and invalidate its queued samples.
    async fn stop_source(&self, slot: &mut Option<Box<dyn PositionSource>>) -> Option<SourceKind> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut source = slot.take()?;
        source.stop().await;
        Some(source.kind())
    }

    fn next_emitter(&self, kind: SourceKind) -> SampleEmitter {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SampleEmitter::new(self.commands.clone(), generation, kind)
    }

    async fn real_start(&self) -> Coordinate {
        if let Some(sample) = self.last_real_position() {
            return sample.coordinate();
        }
        match self.provider.current_position().await {
            Ok(sample) => sample.coordinate(),
            Err(e) => {
                debug!(error = %e, "No real position, simulating from configured origin");
                self.settings.simulation.origin
            }
        }
    }

    async fn restore_real_position(&self) -> Result<(), TrackerError> {
        let restored = match self.provider.current_position().await {
            Ok(sample) => Some(sample),
            Err(e) => {
                debug!(error = %e, "Falling back to last known real position");
                self.last_real_position()
            }
        };

        match restored {
            Some(sample) => self.send(PipelineCommand::RestorePosition(sample)).await,
            None => Ok(()),
        }
    }
}
