//! Domain models for GeoMarker.

pub mod marker;
pub mod notification;
pub mod permission;
pub mod position;

pub use marker::{
    AddMarkerImageRequest, CreateMarkerRequest, Marker, MarkerImage, UpdateMarkerRequest,
};
pub use notification::{
    ActiveNotification, NotificationContent, NotificationHandle, ProximityPayload,
};
pub use permission::{Permission, PermissionStatus};
pub use position::{Coordinate, PositionSample};
