//! Domain error types.

use thiserror::Error;

use crate::models::Permission;

/// Errors surfaced by domain collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    #[error("Marker not found: {0}")]
    MarkerNotFound(i64),

    #[error("Marker store error: {0}")]
    Store(String),
}
