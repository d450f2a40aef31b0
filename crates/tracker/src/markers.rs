//! Marker and image management.
//!
//! Every mutation refreshes the tracker's marker snapshot so proximity
//! checks see the change on the next sample.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use domain::models::{
    AddMarkerImageRequest, CreateMarkerRequest, Marker, MarkerImage, UpdateMarkerRequest,
};
use persistence::repositories::{MarkerImageRepository, MarkerRepository};

use crate::error::TrackerError;
use crate::tracker::ProximityTracker;

#[derive(Clone)]
pub struct MarkerService {
    markers: MarkerRepository,
    images: MarkerImageRepository,
    tracker: Arc<ProximityTracker>,
}

impl MarkerService {
    pub fn new(pool: SqlitePool, tracker: Arc<ProximityTracker>) -> Self {
        Self {
            markers: MarkerRepository::new(pool.clone()),
            images: MarkerImageRepository::new(pool),
            tracker,
        }
    }

    pub fn repository(&self) -> &MarkerRepository {
        &self.markers
    }

    pub async fn add_marker(&self, request: CreateMarkerRequest) -> Result<Marker, TrackerError> {
        request.validate()?;

        let entity = self
            .markers
            .create(request.latitude, request.longitude, request.description.as_deref())
            .await?;
        let marker: Marker = entity.into();

        info!(
            marker_id = marker.id,
            latitude = marker.latitude,
            longitude = marker.longitude,
            "Marker added"
        );

        self.refresh_snapshot().await?;
        Ok(marker)
    }

    pub async fn update_marker(
        &self,
        id: i64,
        request: UpdateMarkerRequest,
    ) -> Result<Marker, TrackerError> {
        request.validate()?;

        let entity = self
            .markers
            .update_description(id, &request.description)
            .await?
            .ok_or_else(|| marker_not_found(id))?;

        info!(marker_id = id, "Marker description updated");

        self.refresh_snapshot().await?;
        Ok(entity.into())
    }

    /// Delete a marker and its images and forget its visit history.
    pub async fn delete_marker(&self, id: i64) -> Result<(), TrackerError> {
        let deleted = self.markers.delete(id).await?;
        if deleted == 0 {
            return Err(marker_not_found(id));
        }

        info!(marker_id = id, "Marker deleted");

        self.tracker.forget_marker(id).await?;
        self.refresh_snapshot().await?;
        Ok(())
    }

    pub async fn get_marker(&self, id: i64) -> Result<Marker, TrackerError> {
        self.markers
            .find_by_id(id)
            .await?
            .map(Marker::from)
            .ok_or_else(|| marker_not_found(id))
    }

    pub async fn list_markers(&self) -> Result<Vec<Marker>, TrackerError> {
        let entities = self.markers.list().await?;
        Ok(entities.into_iter().map(Marker::from).collect())
    }

    pub async fn add_image(&self, request: AddMarkerImageRequest) -> Result<MarkerImage, TrackerError> {
        request.validate()?;

        if self.markers.find_by_id(request.marker_id).await?.is_none() {
            return Err(marker_not_found(request.marker_id));
        }

        let image = self.images.create(request.marker_id, &request.uri).await?;
        info!(marker_id = request.marker_id, image_id = image.id, "Image attached");
        Ok(image.into())
    }

    pub async fn delete_image(&self, id: i64) -> Result<(), TrackerError> {
        let deleted = self.images.delete(id).await?;
        if deleted == 0 {
            return Err(TrackerError::NotFound(format!("Image {} not found", id)));
        }
        info!(image_id = id, "Image deleted");
        Ok(())
    }

    pub async fn list_images(&self, marker_id: i64) -> Result<Vec<MarkerImage>, TrackerError> {
        let images = self.images.find_by_marker_id(marker_id).await?;
        Ok(images.into_iter().map(MarkerImage::from).collect())
    }

    /// Reload the tracker's marker snapshot from the database.
    pub async fn refresh_snapshot(&self) -> Result<usize, TrackerError> {
        self.tracker.refresh_markers(&self.markers).await
    }
}

fn marker_not_found(id: i64) -> TrackerError {
    TrackerError::NotFound(format!("Marker {} not found", id))
}
