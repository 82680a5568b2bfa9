//! Circle detection gated by motion regions

use super::config::{CircleConfig, MotionGating};
use crate::Result;
use crate::traits::ImageOps;
use ballwatch_core::{Candidate, Frame, MotionRegion};

/// Runs circle detection and keeps the circles that moved.
#[derive(Debug, Clone)]
pub struct ShapeDetector {
    config: CircleConfig,
    gating: MotionGating,
}

impl ShapeDetector {
    pub fn new(config: CircleConfig, gating: MotionGating) -> Self {
        Self { config, gating }
    }

    /// Same profile with motion gating turned off.
    pub fn ungated(&self) -> Self {
        Self {
            config: self.config.clone(),
            gating: MotionGating::Disabled,
        }
    }

    pub fn config(&self) -> &CircleConfig {
        &self.config
    }

    pub fn gating(&self) -> MotionGating {
        self.gating
    }

    /// Smoothed intensity image that circle detection searches.
    pub fn search_area<O: ImageOps>(&self, ops: &O, frame: &Frame) -> Result<O::Buffer> {
        let gray = ops.grayscale(frame)?;
        ops.blur(&gray, self.config.blur_kernel, self.config.blur_sigma)
    }

    /// Candidates found in `search_area`, in detector order. With gating
    /// enabled only candidates whose center lies in some region survive.
    pub fn detect<O: ImageOps>(
        &self,
        ops: &O,
        search_area: &O::Buffer,
        regions: &[MotionRegion],
    ) -> Result<Vec<Candidate>> {
        let circles = ops.find_circles(search_area, &self.config)?;

        let candidates = circles
            .into_iter()
            .map(|c| Candidate::locate(c.x, c.y, c.radius, regions))
            .filter(|c| self.gating == MotionGating::Disabled || c.contained)
            .collect();

        Ok(candidates)
    }

    /// [`ShapeDetector::search_area`] followed by [`ShapeDetector::detect`].
    pub fn detect_in_frame<O: ImageOps>(
        &self,
        ops: &O,
        frame: &Frame,
        regions: &[MotionRegion],
    ) -> Result<Vec<Candidate>> {
        let area = self.search_area(ops, frame)?;
        self.detect(ops, &area, regions)
    }
}

impl Default for ShapeDetector {
    fn default() -> Self {
        Self::new(CircleConfig::default(), MotionGating::Enabled)
    }
}
