// ---------------------------------------------------------------------------
// GridError: misuse of the grid API and invalid configuration
// ---------------------------------------------------------------------------

use std::fmt;

use bevy::prelude::Entity;

/// Errors returned by `PowerGrid` mutation helpers and `GridParams` loading.
///
/// Resolution itself never fails: unsatisfiable demand is reported through
/// `ConsumerEntry::is_powered`, not through this type.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// The handle was never registered as a producer (or was unregistered).
    UnknownProducer(Entity),
    /// The handle was never registered as a consumer (or was unregistered).
    UnknownConsumer(Entity),
    /// Cell size must be finite, positive and at most `MAX_CELL_SIZE`.
    InvalidCellSize(f32),
    /// Movement threshold must be finite and non-negative.
    InvalidMovementThreshold(f32),
    /// The params document could not be parsed.
    Config(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::UnknownProducer(entity) => {
                write!(f, "Unknown producer: {entity} is not registered")
            }
            GridError::UnknownConsumer(entity) => {
                write!(f, "Unknown consumer: {entity} is not registered")
            }
            GridError::InvalidCellSize(size) => write!(f, "Invalid cell size: {size}"),
            GridError::InvalidMovementThreshold(threshold) => {
                write!(f, "Invalid movement threshold: {threshold}")
            }
            GridError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        GridError::Config(e.to_string())
    }
}
