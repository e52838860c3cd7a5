//! Error types for geowatch.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, GeoWatchError>;

/// Errors produced by the index, its geometry helpers and its configuration.
///
/// Looking up or removing an identity that is not present is never an error;
/// those operations report absence through their return values.
#[derive(Debug, Error)]
pub enum GeoWatchError {
    /// A rectangle could not be built from the given coordinates.
    #[error("Invalid rectangle: {0}")]
    InvalidRect(String),

    /// Caller supplied coordinates, identities or parameters are out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A user object carried a type tag reserved for internal entities.
    #[error("Type tag {0} is reserved for internal use")]
    ReservedType(i32),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A listener's background thread could not be started.
    #[error("Failed to spawn listener thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
