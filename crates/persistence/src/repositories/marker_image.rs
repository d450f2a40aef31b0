//! Marker image repository for database operations.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::entities::MarkerImageEntity;
use crate::metrics::QueryTimer;

/// Repository for marker image database operations.
#[derive(Clone)]
pub struct MarkerImageRepository {
    pool: SqlitePool,
}

impl MarkerImageRepository {
    /// Creates a new MarkerImageRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Attach an image to a marker.
    pub async fn create(&self, marker_id: i64, uri: &str) -> Result<MarkerImageEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_marker_image");
        let result = sqlx::query_as::<_, MarkerImageEntity>(
            r#"
            INSERT INTO marker_images (marker_id, uri, created_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(marker_id)
        .bind(uri)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Find all images of a marker, oldest first.
    pub async fn find_by_marker_id(
        &self,
        marker_id: i64,
    ) -> Result<Vec<MarkerImageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_images_by_marker");
        let result = sqlx::query_as::<_, MarkerImageEntity>(
            r#"
            SELECT * FROM marker_images
            WHERE marker_id = $1
            ORDER BY id
            "#,
        )
        .bind(marker_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Delete a single image.
    /// Returns the number of rows deleted.
    pub async fn delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_marker_image");
        let result = sqlx::query(
            r#"
            DELETE FROM marker_images WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.finish(result).map(|done| done.rows_affected())
    }
}
