//! spotq: first-come spot allocation with a waiting queue.

mod health;
mod version;

pub mod allocation;
pub mod announcer;
pub mod command;
pub mod config;
pub mod service;
pub mod transport;

pub use allocation::{Event, RequesterId, SpotError, SpotId, SpotPool, SpotStatus};
pub use announcer::{AnnounceError, Announcer, AnnouncerConfig, ChatAnnouncer};
pub use command::Command;
pub use config::{ConfigError, SpotConfig};
pub use health::{Health, HealthResponse};
pub use service::{HealthSnapshot, SpotService};
pub use version::{SPOTQ_VERSION, VersionInfo};
