use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use domain::models::{PermissionStatus, PositionSample};

use super::{LocationError, LocationProvider, WatchOptions};

const WATCH_BUFFER: usize = 32;

#[derive(Debug)]
struct ScriptState {
    permission: PermissionStatus,
    services_enabled: bool,
    current: Option<PositionSample>,
    watchers: Vec<mpsc::Sender<PositionSample>>,
    watch_requests: Vec<WatchOptions>,
    watch_failure: Option<String>,
}

/// Location provider driven by hand.
///
/// Used by the binary when no platform geolocation is available and by
/// tests. Positions pushed with [`ScriptedLocationProvider::push`] reach
/// every open watcher and become the current fix.
#[derive(Debug)]
pub struct ScriptedLocationProvider {
    state: Mutex<ScriptState>,
}

impl ScriptedLocationProvider {
    /// Create a provider with permission granted, services enabled and the
    /// given current fix.
    pub fn new(current: PositionSample) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                permission: PermissionStatus::Granted,
                services_enabled: true,
                current: Some(current),
                watchers: Vec::new(),
                watch_requests: Vec::new(),
                watch_failure: None,
            }),
        }
    }

    /// Create a provider that has no fix yet.
    pub fn without_fix() -> Self {
        let provider = Self::new(PositionSample::new(0.0, 0.0, chrono::Utc::now()));
        provider.lock().current = None;
        provider
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_permission(&self, permission: PermissionStatus) {
        self.lock().permission = permission;
    }

    pub fn set_services_enabled(&self, enabled: bool) {
        self.lock().services_enabled = enabled;
    }

    pub fn set_current(&self, sample: PositionSample) {
        self.lock().current = Some(sample);
    }

    /// Make every later `watch_position` call fail with `reason`.
    pub fn fail_watch(&self, reason: impl Into<String>) {
        self.lock().watch_failure = Some(reason.into());
    }

    /// Deliver a position to all open watchers. Returns how many received it.
    pub async fn push(&self, sample: PositionSample) -> usize {
        let watchers = {
            let mut state = self.lock();
            state.current = Some(sample.clone());
            state.watchers.retain(|tx| !tx.is_closed());
            state.watchers.clone()
        };

        let mut delivered = 0;
        for tx in watchers {
            if tx.send(sample.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        debug!(delivered, "Scripted position pushed");
        delivered
    }

    /// Number of subscriptions still being listened to.
    pub fn active_watchers(&self) -> usize {
        let mut state = self.lock();
        state.watchers.retain(|tx| !tx.is_closed());
        state.watchers.len()
    }

    /// Options passed to every `watch_position` call so far.
    pub fn watch_requests(&self) -> Vec<WatchOptions> {
        self.lock().watch_requests.clone()
    }
}

#[async_trait::async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        self.lock().permission
    }

    async fn services_enabled(&self) -> bool {
        self.lock().services_enabled
    }

    async fn current_position(&self) -> Result<PositionSample, LocationError> {
        let state = self.lock();
        if !state.services_enabled {
            return Err(LocationError::ServicesDisabled);
        }
        state
            .current
            .clone()
            .ok_or_else(|| LocationError::Provider("No position fix available".to_string()))
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<PositionSample>, LocationError> {
        let mut state = self.lock();
        if !state.services_enabled {
            return Err(LocationError::ServicesDisabled);
        }
        if let Some(reason) = &state.watch_failure {
            return Err(LocationError::Provider(reason.clone()));
        }
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        state.watchers.push(tx);
        state.watch_requests.push(options);
        Ok(rx)
    }
}
