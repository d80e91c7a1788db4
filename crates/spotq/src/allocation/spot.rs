//! Spot identities, requester identities and per-spot state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one spot in the pool. Always in `1..=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotId(u32);

impl SpotId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based index into the pool's spot table.
    pub(crate) fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque requester token supplied by the transport.
///
/// Compared by equality only. `Display` renders a chat mention (`<@id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequesterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<@{}>", self.0)
    }
}

/// Who holds a taken spot and since when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub owner: RequesterId,
    pub assigned_at: DateTime<Utc>,
}

/// State of a single spot.
///
/// The occupancy record only exists inside `Taken`, so a spot can never be both
/// down and owned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpotState {
    #[default]
    Available,
    Taken(Occupancy),
    Down,
}

impl SpotState {
    pub fn status(&self) -> SpotStatus {
        match self {
            SpotState::Available => SpotStatus::Available,
            SpotState::Taken(_) => SpotStatus::Taken,
            SpotState::Down => SpotStatus::Down,
        }
    }

    pub fn occupancy(&self) -> Option<&Occupancy> {
        match self {
            SpotState::Taken(occupancy) => Some(occupancy),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SpotState::Available)
    }

    pub fn is_down(&self) -> bool {
        matches!(self, SpotState::Down)
    }

    pub fn is_owned_by(&self, requester: &RequesterId) -> bool {
        self.occupancy().is_some_and(|o| &o.owner == requester)
    }
}

/// Data-free status tag, used in snapshots and health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Available,
    Taken,
    Down,
}
