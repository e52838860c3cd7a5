//! Validation for geographic coordinates and listener parameters.

use crate::error::{GeoWatchError, Result};
use std::time::Duration;

/// Validates a longitude/latitude pair.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geowatch::compute::validation::validate_lng_lat;
///
/// assert!(validate_lng_lat(-74.0060, 40.7128).is_ok());
/// assert!(validate_lng_lat(200.0, 40.0).is_err());
/// assert!(validate_lng_lat(-74.0, 95.0).is_err());
/// ```
pub fn validate_lng_lat(lng: f64, lat: f64) -> Result<()> {
    if !lng.is_finite() {
        return Err(GeoWatchError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            lng
        )));
    }

    if !lat.is_finite() {
        return Err(GeoWatchError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lng) {
        return Err(GeoWatchError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lng
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(GeoWatchError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    Ok(())
}

/// Validates an object identity. Identities must be non-empty.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(GeoWatchError::InvalidInput(
            "Identity cannot be empty".into(),
        ));
    }
    Ok(())
}

/// Validates listener construction parameters.
pub fn validate_listener_params(capacity: usize, interval: Duration) -> Result<()> {
    if capacity == 0 {
        return Err(GeoWatchError::InvalidInput(
            "Channel capacity must be greater than zero".into(),
        ));
    }

    if interval.is_zero() {
        return Err(GeoWatchError::InvalidInput(
            "Notify interval must be greater than zero".into(),
        ));
    }

    Ok(())
}
