//! Ballwatch: motion-gated ball detection over live or replayed frames.
//!
//! The vision pipeline lives in `ballwatch-cv`; this crate schedules it.

pub mod session;
pub mod synthetic;

pub use session::{SessionScheduler, TickDriver, TickOutcome};
pub use synthetic::SyntheticBallSource;
