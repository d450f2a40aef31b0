use std::f64::consts::TAU;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::models::{Coordinate, PositionSample};

use crate::error::TrackerError;

use super::{PositionSource, SampleEmitter, SourceKind};

const SIMULATED_ACCURACY_METERS: f64 = 5.0;
const SIMULATED_SPEED_MPS: f64 = 0.5;

/// Tunables of the simulated walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub tick: Duration,
    pub step_degrees: f64,
    pub heading_jitter_radians: f64,
    pub start_jitter_degrees: f64,
    /// Start used when no real position is known.
    pub origin: Coordinate,
    /// Fixed RNG seed for reproducible walks.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000),
            step_degrees: 0.0001,
            heading_jitter_radians: 0.1,
            start_jitter_degrees: 0.0005,
            origin: Coordinate::new(58.0105, 56.2502),
            seed: None,
        }
    }
}

/// Random walk in degree space.
///
/// The direction is an angle from east, counterclockwise, so a step moves
/// `sin` of it in latitude and `cos` of it in longitude.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    latitude: f64,
    longitude: f64,
    direction: f64,
    step_degrees: f64,
    heading_jitter_radians: f64,
}

impl RandomWalk {
    /// Start near `start`, offset by up to the configured jitter, facing a
    /// random direction.
    pub fn new<R: Rng + ?Sized>(start: Coordinate, settings: &SimulationSettings, rng: &mut R) -> Self {
        let latitude = start.latitude + symmetric(rng, settings.start_jitter_degrees);
        let longitude = start.longitude + symmetric(rng, settings.start_jitter_degrees);

        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: wrap_longitude(longitude),
            direction: rng.gen_range(0.0..TAU),
            step_degrees: settings.step_degrees,
            heading_jitter_radians: settings.heading_jitter_radians,
        }
    }

    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Compass heading in degrees clockwise from north.
    pub fn heading_degrees(&self) -> f64 {
        (90.0 - self.direction.to_degrees()).rem_euclid(360.0)
    }

    /// Perturb the direction and take one step.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.direction += symmetric(rng, self.heading_jitter_radians);
        self.latitude = (self.latitude + self.direction.sin() * self.step_degrees).clamp(-90.0, 90.0);
        self.longitude = wrap_longitude(self.longitude + self.direction.cos() * self.step_degrees);
    }

    pub fn sample(&self, captured_at: DateTime<Utc>) -> PositionSample {
        PositionSample::new(self.latitude, self.longitude, captured_at)
            .with_accuracy(SIMULATED_ACCURACY_METERS)
            .with_speed(SIMULATED_SPEED_MPS)
            .with_heading(self.heading_degrees())
    }
}

fn symmetric<R: Rng + ?Sized>(rng: &mut R, max: f64) -> f64 {
    if max > 0.0 {
        rng.gen_range(-max..=max)
    } else {
        0.0
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else if longitude < -180.0 {
        longitude + 360.0
    } else {
        longitude
    }
}

/// Emits one random-walk sample per tick, starting with the (jittered)
/// start point itself.
pub struct SimulatedPositionSource {
    settings: SimulationSettings,
    start: Coordinate,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedPositionSource {
    pub fn new(settings: SimulationSettings, start: Coordinate) -> Self {
        Self {
            settings,
            start,
            cancel: None,
            handle: None,
        }
    }

    pub fn start_coordinate(&self) -> Coordinate {
        self.start
    }
}

impl Drop for SimulatedPositionSource {
    fn drop(&mut self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }
}

#[async_trait::async_trait]
impl PositionSource for SimulatedPositionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }

    async fn start(&mut self, emitter: SampleEmitter) -> Result<(), TrackerError> {
        self.stop().await;

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut walk = RandomWalk::new(self.start, &self.settings, &mut rng);
        let tick = self.settings.tick;
        let token = CancellationToken::new();
        let cancelled = token.clone();

        info!(
            generation = emitter.generation(),
            latitude = self.start.latitude,
            longitude = self.start.longitude,
            tick_ms = tick.as_millis() as u64,
            "Simulated position source started"
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut first = true;

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if first {
                    first = false;
                } else {
                    walk.advance(&mut rng);
                }

                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    sent = emitter.emit(walk.sample(Utc::now())) => {
                        if !sent {
                            debug!("Pipeline closed, simulated source exiting");
                            break;
                        }
                    }
                }
            }
        });

        self.cancel = Some(token);
        self.handle = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Simulated position task panicked: {}", e);
            }
            info!("Simulated position source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
