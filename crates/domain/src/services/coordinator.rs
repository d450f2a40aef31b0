//! Single-notification coordinator.
//!
//! Keeps at most one proximity notification alive: new arrivals replace the
//! outstanding notification, leaving every zone cancels it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{ActiveNotification, Marker, NotificationContent, NotificationHandle};
use crate::services::notification::NotificationSink;

/// What a coordinator call did to the outstanding notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Unchanged,
    /// idle → active.
    Raised,
    /// active → active with a new handle.
    Replaced,
    /// active → idle.
    Cleared,
    /// The sink rejected the call; see logs.
    Failed,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Unchanged => "unchanged",
            Transition::Raised => "raised",
            Transition::Replaced => "replaced",
            Transition::Cleared => "cleared",
            Transition::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-state machine owning the single outstanding notification.
pub struct NotificationCoordinator {
    sink: Arc<dyn NotificationSink>,
    active: Option<ActiveNotification>,
}

impl NotificationCoordinator {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink, active: None }
    }

    pub fn active(&self) -> Option<&ActiveNotification> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// React to a debounced set of newly entered markers.
    ///
    /// An empty set is a no-op. Otherwise any outstanding notification is
    /// cancelled first and a single new one describing all markers is shown.
    pub async fn announce(&mut self, newly_entered: &[&Marker], now: DateTime<Utc>) -> Transition {
        if newly_entered.is_empty() {
            return Transition::Unchanged;
        }

        let replacing = match self.active.take() {
            Some(previous) => {
                // A failed cancel is not retried; the stale handle is dropped.
                self.cancel_handle(&previous.handle).await;
                true
            }
            None => false,
        };

        let content = NotificationContent::for_markers(newly_entered);
        let marker_ids = content.payload.marker_ids.clone();

        match self.sink.show(&content).await {
            Ok(handle) => {
                info!(
                    handle = %handle,
                    marker_ids = ?marker_ids,
                    replaced = replacing,
                    "Proximity notification shown"
                );
                self.active = Some(ActiveNotification {
                    handle,
                    marker_ids,
                    raised_at: now,
                });
                if replacing {
                    Transition::Replaced
                } else {
                    Transition::Raised
                }
            }
            Err(e) => {
                warn!(error = %e, marker_ids = ?marker_ids, "Failed to show proximity notification");
                Transition::Failed
            }
        }
    }

    /// React to an empty instantaneous in-zone set.
    ///
    /// Cancels the outstanding notification. If the sink fails the handle is
    /// kept so the next empty sample tries again.
    pub async fn clear(&mut self) -> Transition {
        let Some(active) = self.active.take() else {
            return Transition::Unchanged;
        };

        if self.cancel_handle(&active.handle).await {
            info!(handle = %active.handle, "Proximity notification cleared");
            Transition::Cleared
        } else {
            self.active = Some(active);
            Transition::Failed
        }
    }

    async fn cancel_handle(&self, handle: &NotificationHandle) -> bool {
        match self.sink.cancel(handle).await {
            Ok(()) => {
                debug!(handle = %handle, "Notification cancelled");
                true
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "Failed to cancel notification");
                false
            }
        }
    }
}

impl std::fmt::Debug for NotificationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCoordinator")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
