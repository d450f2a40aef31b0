//! Proximity notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::marker::Marker;

/// Title shown on every proximity notification.
pub const PROXIMITY_TITLE: &str = "You are near saved markers!";

/// First line of the notification body, followed by one line per marker.
const PROXIMITY_BODY_HEADER: &str = "You are near saved markers:";

/// Opaque identifier returned by the notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(pub String);

impl NotificationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data attached to a proximity notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityPayload {
    pub marker_ids: Vec<i64>,
}

/// Content handed to the notification sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub payload: ProximityPayload,
}

impl NotificationContent {
    /// Compose a single notification describing every given marker.
    pub fn for_markers(markers: &[&Marker]) -> Self {
        let mut body = String::from(PROXIMITY_BODY_HEADER);
        for marker in markers {
            body.push_str("\n- ");
            body.push_str(&marker.label());
        }

        Self {
            title: PROXIMITY_TITLE.to_string(),
            body,
            payload: ProximityPayload {
                marker_ids: markers.iter().map(|m| m.id).collect(),
            },
        }
    }
}

/// The single outstanding notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveNotification {
    pub handle: NotificationHandle,
    pub marker_ids: Vec<i64>,
    pub raised_at: DateTime<Utc>,
}
