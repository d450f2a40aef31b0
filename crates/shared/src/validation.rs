//! Coordinate and position metadata validation.

use std::borrow::Cow;

use validator::ValidationError;

/// Latitude bounds in decimal degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Longitude bounds in decimal degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// True when both values are finite and inside WGS-84 bounds.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    LATITUDE_RANGE.contains(&latitude) && LONGITUDE_RANGE.contains(&longitude)
}

fn require(ok: bool, code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if ok {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    Err(err)
}

pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    require(
        LATITUDE_RANGE.contains(&lat),
        "latitude_range",
        "Latitude must be between -90 and 90",
    )
}

pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    require(
        LONGITUDE_RANGE.contains(&lon),
        "longitude_range",
        "Longitude must be between -180 and 180",
    )
}

/// Horizontal accuracy radius in meters.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    require(accuracy >= 0.0, "accuracy_range", "Accuracy must be non-negative")
}

/// Compass bearing in degrees, 0 = north.
pub fn validate_heading(heading: f64) -> Result<(), ValidationError> {
    require(
        (0.0..=360.0).contains(&heading),
        "heading_range",
        "Heading must be between 0 and 360",
    )
}

/// Ground speed in meters per second.
pub fn validate_speed(speed: f64) -> Result<(), ValidationError> {
    require(speed >= 0.0, "speed_range", "Speed must be non-negative")
}
