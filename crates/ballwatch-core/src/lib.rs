//! Ballwatch core data model
//!
//! Frames, motion regions, ball candidates and the session state machine.
//! Nothing here touches pixels beyond validation; image processing lives in
//! `ballwatch-cv`.

pub mod detection;
pub mod frame;
pub mod geometry;
pub mod session;
pub mod source;

pub use detection::{Analysis, Candidate, MotionRegion, select_best};
pub use frame::{Frame, FrameError};
pub use geometry::BBox;
pub use session::{Mode, SessionError, SessionState, Ticket};
pub use source::{FacingMode, FrameSource, SourceError};
