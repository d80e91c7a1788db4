//! Pool configuration.

use std::time::Duration;

/// Default pool size.
pub const DEFAULT_NUM_SPOTS: usize = 2;

/// Largest pool a single service will manage.
pub const MAX_NUM_SPOTS: usize = 1000;

/// Default long-occupancy threshold (3 hours).
pub const DEFAULT_OVERDUE_THRESHOLD: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("pool must have at least one spot")]
    NoSpots,
    #[error("pool size {0} is too large (at most {max} spots)", max = MAX_NUM_SPOTS)]
    TooManySpots(usize),
    #[error("overdue threshold must be greater than zero")]
    ZeroThreshold,
}

/// Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotConfig {
    num_spots: usize,
    overdue_threshold: Duration,
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self {
            num_spots: DEFAULT_NUM_SPOTS,
            overdue_threshold: DEFAULT_OVERDUE_THRESHOLD,
        }
    }
}

impl SpotConfig {
    pub fn new(num_spots: usize, overdue_threshold: Duration) -> Result<Self, ConfigError> {
        if num_spots == 0 {
            return Err(ConfigError::NoSpots);
        }
        if num_spots > MAX_NUM_SPOTS {
            return Err(ConfigError::TooManySpots(num_spots));
        }
        if overdue_threshold.is_zero() {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(Self {
            num_spots,
            overdue_threshold,
        })
    }

    pub fn num_spots(&self) -> usize {
        self.num_spots
    }

    pub fn overdue_threshold(&self) -> Duration {
        self.overdue_threshold
    }
}
