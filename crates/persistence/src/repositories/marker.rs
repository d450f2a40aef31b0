//! Marker repository for database operations.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

use domain::errors::DomainError;
use domain::models::Marker;
use domain::services::MarkerStore;

use crate::entities::MarkerEntity;
use crate::metrics::QueryTimer;

/// Repository for marker-related database operations.
#[derive(Clone)]
pub struct MarkerRepository {
    pool: SqlitePool,
}

impl MarkerRepository {
    /// Creates a new MarkerRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new marker.
    pub async fn create(
        &self,
        latitude: f64,
        longitude: f64,
        description: Option<&str>,
    ) -> Result<MarkerEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_marker");
        let result = sqlx::query_as::<_, MarkerEntity>(
            r#"
            INSERT INTO markers (latitude, longitude, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Find marker by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<MarkerEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_marker_by_id");
        let result = sqlx::query_as::<_, MarkerEntity>(
            r#"
            SELECT * FROM markers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// List all markers.
    pub async fn list(&self) -> Result<Vec<MarkerEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_markers");
        let result = sqlx::query_as::<_, MarkerEntity>(
            r#"
            SELECT * FROM markers ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Count all markers.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_markers");
        let result: Result<(i64,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM markers
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.finish(result).map(|(count,)| count)
    }

    /// Replace the description of a marker.
    /// Returns None if the marker does not exist.
    pub async fn update_description(
        &self,
        id: i64,
        description: &str,
    ) -> Result<Option<MarkerEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_marker_description");
        let result = sqlx::query_as::<_, MarkerEntity>(
            r#"
            UPDATE markers SET description = $1 WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(result)
    }

    /// Delete a marker together with its images.
    /// Returns the number of markers deleted.
    pub async fn delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_marker");
        let result = self.delete_with_images(id).await;
        timer.finish(result)
    }

    async fn delete_with_images(&self, id: i64) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM marker_images WHERE marker_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            DELETE FROM markers WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl MarkerStore for MarkerRepository {
    async fn list_markers(&self) -> Result<Vec<Marker>, DomainError> {
        let entities = self.list().await.map_err(|e| {
            error!(error = %e, "Failed to list markers");
            DomainError::Store(e.to_string())
        })?;
        Ok(entities.into_iter().map(Marker::from).collect())
    }
}
