//! Repository implementations for database operations.

pub mod marker;
pub mod marker_image;

pub use marker::MarkerRepository;
pub use marker_image::MarkerImageRepository;
