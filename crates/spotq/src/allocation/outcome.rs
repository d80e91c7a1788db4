//! Outcomes of engine operations and their chat rendering.
//!
//! Every operation yields either an ordered list of [`Event`]s or a [`SpotError`].
//! Both render to the plain-text lines delivered back to the requester.

use std::fmt;
use std::time::Duration;

use chrono::TimeDelta;

use super::spot::{RequesterId, SpotId, SpotState};

/// Something that happened (or was observed) during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Assigned {
        requester: RequesterId,
        spot: SpotId,
    },
    Queued {
        requester: RequesterId,
    },
    Released {
        spot: SpotId,
        refilled: bool,
    },
    Passed {
        requester: RequesterId,
        spot: SpotId,
    },
    PriorityKept {
        requester: RequesterId,
    },
    Displaced {
        owner: RequesterId,
        spot: SpotId,
    },
    MarkedDown {
        spot: SpotId,
    },
    MarkedUp {
        spot: SpotId,
    },
    Overdue {
        requester: RequesterId,
        spot: SpotId,
        held: TimeDelta,
    },
    NoneOverdue {
        threshold: Duration,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Assigned { requester, spot } => {
                write!(f, "Assigned {requester} to spot {spot}")
            }
            Event::Queued { requester } => write!(
                f,
                "No spots available for {requester}. Added to waiting queue."
            ),
            Event::Released {
                spot,
                refilled: true,
            } => write!(
                f,
                "Spot {spot} is now available and assigned to next person in queue"
            ),
            Event::Released {
                spot,
                refilled: false,
            } => write!(f, "Spot {spot} is now available"),
            Event::Passed { requester, spot } => write!(f, "{requester} passed spot {spot}"),
            Event::PriorityKept { requester } => {
                write!(f, "{requester} is now first in the waiting queue")
            }
            Event::Displaced { owner, spot } => {
                write!(f, "{owner} was moved off spot {spot} for maintenance")
            }
            Event::MarkedDown { spot } => write!(f, "Spot {spot} is now down"),
            Event::MarkedUp { spot } => write!(f, "Spot {spot} is back up"),
            Event::Overdue {
                requester,
                spot,
                held,
            } => write!(
                f,
                "{requester} ⚠️ WARNING: You've had spot {spot} for {:.1} hours. Please move your car!",
                held.num_milliseconds() as f64 / 3_600_000.0
            ),
            Event::NoneOverdue { threshold } => write!(
                f,
                "No cars have been parked for more than {}.",
                format_duration(*threshold)
            ),
        }
    }
}

/// Expected, recoverable conditions. None of these mutate the pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpotError {
    #[error("{requester} You already have spot {spot}")]
    AlreadyAssigned { requester: RequesterId, spot: SpotId },
    #[error("{requester} You don't have an assigned spot yet, please wait!")]
    NotAssigned { requester: RequesterId },
    #[error("Spot #{spot} does not exist (valid spots are 1-{num_spots})")]
    InvalidSpot { spot: u32, num_spots: usize },
    #[error("Spot {spot} is already available or taken")]
    NotDown { spot: SpotId },
    #[error("Spot {spot} is already down")]
    AlreadyDown { spot: SpotId },
}

/// Read-only report of every spot and the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub spots: Vec<(SpotId, ListedSpot)>,
    pub queue: Vec<RequesterId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListedSpot {
    Available,
    Taken(RequesterId),
    Down,
}

impl From<&SpotState> for ListedSpot {
    fn from(state: &SpotState) -> Self {
        match state {
            SpotState::Available => ListedSpot::Available,
            SpotState::Taken(occupancy) => ListedSpot::Taken(occupancy.owner.clone()),
            SpotState::Down => ListedSpot::Down,
        }
    }
}

impl Listing {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.spots.len() + self.queue.len() + 2);
        lines.push("🚗 Current spot assignments:".to_string());
        for (id, spot) in &self.spots {
            let line = match spot {
                ListedSpot::Available => format!("Spot {id}: Available"),
                ListedSpot::Taken(owner) => format!("Spot {id}: {owner}"),
                ListedSpot::Down => format!("Spot {id}: Down"),
            };
            lines.push(line);
        }

        if self.queue.is_empty() {
            lines.push("No one is currently in the queue.".to_string());
        } else {
            lines.push("🚗 Current queue:".to_string());
            lines.extend(self.queue.iter().map(|r| r.to_string()));
        }
        lines
    }
}

/// Human wording for a threshold: "3 hours", "1.5 hours", "30 minutes", "45 seconds".
pub fn format_duration(duration: Duration) -> String {
    fn unit(count: u64, singular: &str) -> String {
        if count == 1 {
            format!("1 {singular}")
        } else {
            format!("{count} {singular}s")
        }
    }

    let secs = duration.as_secs();
    match secs {
        0..60 => unit(secs, "second"),
        60..3600 if secs % 60 == 0 => unit(secs / 60, "minute"),
        60..3600 => format!("{:.1} minutes", duration.as_secs_f64() / 60.0),
        _ if secs % 3600 == 0 => unit(secs / 3600, "hour"),
        _ => format!("{:.1} hours", duration.as_secs_f64() / 3600.0),
    }
}
