//! Notification sink for local proximity alerts.
//!
//! Provides the abstraction over the platform notification API and a mock
//! implementation that logs and records every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{NotificationContent, NotificationHandle, PermissionStatus};

/// Errors returned by a notification sink.
#[derive(Debug, Clone, Error)]
pub enum NotificationSinkError {
    #[error("Failed to show notification: {0}")]
    Show(String),

    #[error("Failed to cancel notification {handle}: {reason}")]
    Cancel {
        handle: NotificationHandle,
        reason: String,
    },
}

/// Platform notification API.
///
/// The sink is called fire-and-forget: callers log failures and move on.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    /// Ask the user for permission to post notifications.
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    /// Show a notification immediately, returning its handle.
    async fn show(
        &self,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, NotificationSinkError>;

    /// Cancel a previously shown notification.
    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), NotificationSinkError>;
}

/// A call observed by [`MockNotificationSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Show {
        handle: NotificationHandle,
        content: NotificationContent,
    },
    Cancel {
        handle: NotificationHandle,
    },
}

/// Mock notification sink for development and testing.
///
/// Logs notifications instead of posting them and keeps a record of every
/// successful call.
#[derive(Debug)]
pub struct MockNotificationSink {
    permission: PermissionStatus,
    fail_show: AtomicBool,
    fail_cancel: AtomicBool,
    calls: Mutex<Vec<SinkCall>>,
}

impl MockNotificationSink {
    /// Create a new mock sink with permission granted.
    pub fn new() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fail_show: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock sink whose every call fails.
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_fail_show(true);
        sink.set_fail_cancel(true);
        sink
    }

    /// Create a mock sink that refuses notification permission.
    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::new()
        }
    }

    pub fn set_fail_show(&self, fail: bool) {
        self.fail_show.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_cancel(&self, fail: bool) {
        self.fail_cancel.store(fail, Ordering::SeqCst);
    }

    /// Every successful call, in order.
    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock_calls().clone()
    }

    pub fn shown(&self) -> Vec<NotificationContent> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Show { content, .. } => Some(content.clone()),
                SinkCall::Cancel { .. } => None,
            })
            .collect()
    }

    pub fn show_count(&self) -> usize {
        self.shown().len()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock_calls()
            .iter()
            .filter(|call| matches!(call, SinkCall::Cancel { .. }))
            .count()
    }

    /// Handles shown and not yet cancelled.
    pub fn outstanding(&self) -> Vec<NotificationHandle> {
        let mut outstanding = Vec::new();
        for call in self.lock_calls().iter() {
            match call {
                SinkCall::Show { handle, .. } => outstanding.push(handle.clone()),
                SinkCall::Cancel { handle } => outstanding.retain(|h| h != handle),
            }
        }
        outstanding
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<SinkCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockNotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NotificationSink for MockNotificationSink {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn show(
        &self,
        content: &NotificationContent,
    ) -> Result<NotificationHandle, NotificationSinkError> {
        if self.fail_show.load(Ordering::SeqCst) {
            tracing::warn!(
                marker_ids = ?content.payload.marker_ids,
                "Mock notification sink simulating show failure"
            );
            return Err(NotificationSinkError::Show("Simulated failure".to_string()));
        }

        let handle = NotificationHandle::new(Uuid::new_v4().to_string());
        tracing::info!(
            handle = %handle,
            title = %content.title,
            marker_ids = ?content.payload.marker_ids,
            "Mock: Would show proximity notification"
        );

        self.lock_calls().push(SinkCall::Show {
            handle: handle.clone(),
            content: content.clone(),
        });
        Ok(handle)
    }

    async fn cancel(&self, handle: &NotificationHandle) -> Result<(), NotificationSinkError> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            tracing::warn!(handle = %handle, "Mock notification sink simulating cancel failure");
            return Err(NotificationSinkError::Cancel {
                handle: handle.clone(),
                reason: "Simulated failure".to_string(),
            });
        }

        tracing::info!(handle = %handle, "Mock: Would cancel proximity notification");
        self.lock_calls().push(SinkCall::Cancel {
            handle: handle.clone(),
        });
        Ok(())
    }
}
