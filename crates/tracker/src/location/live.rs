use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TrackerError;

use super::{LocationProvider, PositionSource, SampleEmitter, SourceKind, WatchOptions};

/// Forwards the provider's continuous updates into the pipeline.
pub struct LivePositionSource {
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl LivePositionSource {
    pub fn new(provider: Arc<dyn LocationProvider>, options: WatchOptions) -> Self {
        Self {
            provider,
            options,
            cancel: None,
            handle: None,
        }
    }
}

impl Drop for LivePositionSource {
    fn drop(&mut self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }
}

#[async_trait::async_trait]
impl PositionSource for LivePositionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    async fn start(&mut self, emitter: SampleEmitter) -> Result<(), TrackerError> {
        self.stop().await;

        let mut updates = self.provider.watch_position(self.options).await?;
        let token = CancellationToken::new();
        let cancelled = token.clone();

        info!(
            generation = emitter.generation(),
            interval_ms = self.options.time_interval.as_millis() as u64,
            distance_meters = self.options.distance_interval_meters,
            accuracy = ?self.options.accuracy,
            "Live position source started"
        );

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    update = updates.recv() => match update {
                        Some(sample) => {
                            tokio::select! {
                                biased;
                                _ = cancelled.cancelled() => break,
                                sent = emitter.emit(sample) => {
                                    if !sent {
                                        debug!("Pipeline closed, live source exiting");
                                        break;
                                    }
                                }
                            }
                        }
                        None => {
                            warn!("Location update stream ended");
                            break;
                        }
                    },
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
                warn!("Live position task panicked: {}", e);
            }
            info!("Live position source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
