//! Marker image entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::MarkerImage;

/// Database row mapping for the marker_images table.
#[derive(Debug, Clone, FromRow)]
pub struct MarkerImageEntity {
    pub id: i64,
    pub marker_id: i64,
    pub uri: String,
    pub created_at: DateTime<Utc>,
}

impl From<MarkerImageEntity> for MarkerImage {
    fn from(entity: MarkerImageEntity) -> Self {
        Self {
            id: entity.id,
            marker_id: entity.marker_id,
            uri: entity.uri,
            created_at: entity.created_at,
        }
    }
}
