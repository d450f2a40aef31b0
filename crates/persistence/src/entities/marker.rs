//! Marker entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::Marker;

/// Database row mapping for the markers table.
#[derive(Debug, Clone, FromRow)]
pub struct MarkerEntity {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MarkerEntity> for Marker {
    fn from(entity: MarkerEntity) -> Self {
        Self {
            id: entity.id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            description: entity.description,
            created_at: entity.created_at,
        }
    }
}
