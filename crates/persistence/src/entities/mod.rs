//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod marker;
pub mod marker_image;

pub use marker::MarkerEntity;
pub use marker_image::MarkerImageEntity;
