//! Health status types.

use serde::{Deserialize, Serialize};

/// Stored lifecycle state of the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Health {
    /// Constructed, not yet announced
    #[default]
    Starting,
    /// Accepting commands
    Ready,
    /// Shutdown requested
    ShuttingDown,
}

/// Response-only status: adds BUSY (ready, but no spot available).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthResponse {
    Starting,
    Ready,
    Busy,
    ShuttingDown,
}

impl From<Health> for HealthResponse {
    fn from(health: Health) -> Self {
        match health {
            Health::Starting => HealthResponse::Starting,
            Health::Ready => HealthResponse::Ready,
            Health::ShuttingDown => HealthResponse::ShuttingDown,
        }
    }
}
