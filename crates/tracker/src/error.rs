use thiserror::Error;

use domain::models::Permission;
use domain::DomainError;

use crate::location::LocationError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    #[error("Position source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Marker store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Proximity pipeline is not running")]
    PipelineClosed,
}

impl TrackerError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::PermissionDenied(Permission::Location) => {
                "Location permission is required to alert you about nearby markers.".into()
            }
            TrackerError::PermissionDenied(Permission::Notifications) => {
                "Notification permission is required to alert you about nearby markers.".into()
            }
            TrackerError::SourceUnavailable(_) => {
                "Could not determine your location. Check that location services are enabled."
                    .into()
            }
            TrackerError::NotFound(msg) | TrackerError::Validation(msg) => msg.clone(),
            TrackerError::Store(msg) => {
                tracing::error!("Marker store error: {}", msg);
                "Could not load saved markers.".into()
            }
            TrackerError::Database(err) => {
                tracing::error!("Database error: {}", err);
                "Could not load saved markers.".into()
            }
            TrackerError::PipelineClosed => "Tracking stopped unexpectedly.".into(),
        }
    }
}

impl From<validator::ValidationErrors> for TrackerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        TrackerError::Validation(messages.join("; "))
    }
}

impl From<DomainError> for TrackerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::PermissionDenied(permission) => TrackerError::PermissionDenied(permission),
            DomainError::MarkerNotFound(id) => TrackerError::NotFound(format!("Marker {} not found", id)),
            DomainError::Store(msg) => TrackerError::Store(msg),
        }
    }
}

impl From<LocationError> for TrackerError {
    fn from(err: LocationError) -> Self {
        TrackerError::SourceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    use domain::models::CreateMarkerRequest;

    #[test]
    fn test_permission_messages() {
        let location = TrackerError::PermissionDenied(Permission::Location);
        let notifications = TrackerError::PermissionDenied(Permission::Notifications);

        assert!(location.user_message().starts_with("Location permission"));
        assert!(notifications.user_message().starts_with("Notification permission"));
    }

    #[test]
    fn test_from_validation_errors() {
        let request = CreateMarkerRequest {
            latitude: 91.0,
            longitude: 56.11,
            description: None,
        };
        let err: TrackerError = request.validate().unwrap_err().into();

        match err {
            TrackerError::Validation(msg) => assert!(msg.contains("Latitude")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_from_domain_error() {
        let err: TrackerError = DomainError::MarkerNotFound(7).into();
        assert_eq!(err.user_message(), "Marker 7 not found");

        let err: TrackerError = DomainError::Store("disk I/O error".into()).into();
        assert!(matches!(err, TrackerError::Store(_)));
        assert_eq!(err.user_message(), "Could not load saved markers.");
    }

    #[test]
    fn test_from_location_error() {
        let err: TrackerError = LocationError::ServicesDisabled.into();
        assert!(matches!(err, TrackerError::SourceUnavailable(_)));
        assert!(err.user_message().contains("location services"));
    }
}
