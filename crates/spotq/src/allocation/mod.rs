//! Spot allocation engine.
//!
//! A fixed pool of numbered spots handed out lowest-number-first, a FIFO waiting
//! queue for when the pool is exhausted, and maintenance controls:
//! - `Available` → `Taken` via request, or auto-fill from the queue
//! - `Taken` → `Available` via release or pass
//! - any → `Down` via mark-down (displacing the owner); `Down` → `Available` via mark-up
//!
//! Down spots are never handed out, not even by the queue auto-fill.

mod outcome;
mod pool;
mod queue;
mod spot;

pub use outcome::{Event, ListedSpot, Listing, SpotError, format_duration};
pub use pool::{Outcome, PoolSnapshot, SpotPool, SpotView};
pub use queue::WaitingQueue;
pub use spot::{Occupancy, RequesterId, SpotId, SpotState, SpotStatus};
