//! Frame source capability.

use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which camera a device should open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Front camera, facing the operator.
    User,
    /// Rear camera, facing the scene.
    #[default]
    Environment,
}

/// Acquisition failures. All of them are fatal to starting a session.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("camera access denied")]
    AccessDenied,

    #[error("no camera available for {0:?}")]
    DeviceUnavailable(FacingMode),

    #[error("frame source failed")]
    Backend(#[from] anyhow::Error),
}

/// Something that produces frames: a camera, a file sequence, a generator.
pub trait FrameSource {
    /// Open the underlying stream. This is the single asynchronous boundary of
    /// a session; it happens once at session start and is never retried.
    fn acquire(&mut self, facing: FacingMode) -> Result<(), SourceError>;

    /// Whether [`FrameSource::acquire`] has succeeded.
    fn is_acquired(&self) -> bool;

    /// Point-in-time sample of the stream. `Ok(None)` means no frame is ready
    /// this tick; errors are per-tick and never end the session.
    fn sample(&mut self) -> anyhow::Result<Option<Frame>>;

    /// Release the device.
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn acquire(&mut self, facing: FacingMode) -> Result<(), SourceError> {
        (**self).acquire(facing)
    }

    fn is_acquired(&self) -> bool {
        (**self).is_acquired()
    }

    fn sample(&mut self) -> anyhow::Result<Option<Frame>> {
        (**self).sample()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
