//! Domain layer for GeoMarker.
//!
//! This crate contains:
//! - Domain models (Marker, MarkerImage, PositionSample, notifications)
//! - The proximity engine: distance, classification, visit debounce and
//!   notification coordination
//! - Collaborator traits for the marker store and the notification sink
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::DomainError;
