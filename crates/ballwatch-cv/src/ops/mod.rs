//! Image primitive backends

#[cfg(feature = "opencv")]
pub mod opencv;

#[cfg(feature = "opencv")]
pub use self::opencv::{OpenCvOps, render_overlay};
