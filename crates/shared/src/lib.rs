//! Shared utilities and common types for GeoMarker.
//!
//! This crate provides common functionality used across all other crates:
//! - Coordinate and position metadata validation

pub mod validation;
