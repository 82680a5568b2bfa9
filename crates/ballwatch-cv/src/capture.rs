//! Live camera frame source

use crate::ops::OpenCvOps;
use anyhow::Context;
use ballwatch_core::{FacingMode, Frame, FrameSource, SourceError};
use log::{info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

/// Camera opened through OpenCV's video I/O.
///
/// The environment-facing camera is `device_index`, the user-facing one the
/// index after it.
pub struct CameraSource {
    device_index: i32,
    capture: Option<VideoCapture>,
    next_sequence: u64,
}

impl CameraSource {
    pub fn new(device_index: i32) -> Self {
        Self {
            device_index,
            capture: None,
            next_sequence: 0,
        }
    }

    fn index_for(&self, facing: FacingMode) -> i32 {
        match facing {
            FacingMode::Environment => self.device_index,
            FacingMode::User => self.device_index + 1,
        }
    }
}

impl FrameSource for CameraSource {
    fn acquire(&mut self, facing: FacingMode) -> Result<(), SourceError> {
        let index = self.index_for(facing);
        let capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open camera {}", index))?;

        let opened = capture
            .is_opened()
            .context("Failed to query camera state")?;
        if !opened {
            return Err(SourceError::DeviceUnavailable(facing));
        }

        info!("camera {} opened ({:?})", index, facing);
        self.capture = Some(capture);
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.capture.is_some()
    }

    fn sample(&mut self) -> anyhow::Result<Option<Frame>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };

        let mut mat = Mat::default();
        if !capture.read(&mut mat).context("Camera read failed")? || mat.empty() {
            return Ok(None);
        }

        let frame = OpenCvOps::frame_from_bgr(&mat, self.next_sequence)?;
        self.next_sequence += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("camera release failed: {}", e);
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
