//! Marker domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::position::Coordinate;

/// Maximum length of a marker description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A geolocated marker placed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Marker {
    /// Create a marker with the current time as its creation timestamp.
    pub fn new(id: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            latitude,
            longitude,
            description: None,
            created_at: Utc::now(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// False when the stored coordinates cannot take part in distance math.
    pub fn has_valid_coordinates(&self) -> bool {
        shared::validation::is_valid_coordinate(self.latitude, self.longitude)
    }

    /// Human-readable label used in notifications.
    ///
    /// Blank descriptions fall back to `Marker #<id>`.
    pub fn label(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => description.to_string(),
            _ => format!("Marker #{}", self.id),
        }
    }
}

/// An image attached to a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerImage {
    pub id: i64,
    pub marker_id: i64,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for creating a marker.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarkerRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Request payload for updating a marker description.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMarkerRequest {
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
}

/// Request payload for attaching an image to a marker.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMarkerImageRequest {
    pub marker_id: i64,

    #[validate(length(min = 1, message = "Image URI is required"))]
    pub uri: String,
}
