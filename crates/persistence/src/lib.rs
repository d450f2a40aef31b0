//! Persistence layer for GeoMarker.
//!
//! This crate contains:
//! - SQLite connection management and embedded migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations for markers and their images

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
