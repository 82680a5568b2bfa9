//! Session scheduling: recording, playback and the tick cadence

pub mod driver;
pub mod scheduler;

pub use driver::{Clock, ManualClock, SystemClock, TickDriver};
pub use scheduler::{SessionScheduler, SkipReason, TickOutcome, TickStats};
