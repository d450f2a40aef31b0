//! Marker store collaborator.

use crate::errors::DomainError;
use crate::models::Marker;

/// Source of the marker snapshot used by the proximity engine.
#[async_trait::async_trait]
pub trait MarkerStore: Send + Sync {
    /// All stored markers, in no particular order.
    async fn list_markers(&self) -> Result<Vec<Marker>, DomainError>;
}
