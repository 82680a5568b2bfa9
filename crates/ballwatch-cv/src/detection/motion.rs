//! Frame-difference motion detection with a threshold sweep

use super::config::MotionConfig;
use crate::Result;
use crate::traits::ImageOps;
use ballwatch_core::{Frame, MotionRegion};
use log::trace;

/// Finds regions of change between two frames.
///
/// The blurred difference image is binarized at every configured level
/// independently. Regions are reported per level and never merged, so the
/// same moving object usually appears once for each level it survives.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    config: MotionConfig,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// Motion regions between `previous` and `current`, ordered by threshold
    /// level as configured, then by the order the region finder reports.
    ///
    /// Frames of different dimensions are a contract violation and fail with
    /// [`ballwatch_core::FrameError::DimensionMismatch`].
    pub fn detect<O: ImageOps>(
        &self,
        ops: &O,
        previous: &Frame,
        current: &Frame,
    ) -> Result<Vec<MotionRegion>> {
        previous.ensure_same_dimensions(current)?;

        let blurred = {
            let before = ops.grayscale(previous)?;
            let after = ops.grayscale(current)?;
            let diff = ops.abs_diff(&before, &after)?;
            ops.blur(&diff, self.config.blur_kernel, 0.0)?
        };

        let mut regions = Vec::new();
        for &level in &self.config.thresholds {
            let mask = ops.threshold(&blurred, level)?;
            let found = ops.find_regions(&mask)?;
            let before = regions.len();

            regions.extend(
                found
                    .into_iter()
                    .filter(|bbox| bbox.meets_min_size(self.config.min_region_size))
                    .map(|bbox| MotionRegion::new(bbox, level)),
            );

            trace!(
                "frame {}: threshold {} -> {} region(s)",
                current.sequence(),
                level,
                regions.len() - before
            );
        }

        Ok(regions)
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedOps, frame_with_square};
    use ballwatch_core::{BBox, FrameError};

    #[test]
    fn test_identical_frames_have_no_motion() -> Result<()> {
        let ops = ScriptedOps::new();
        let frame = frame_with_square(64, 64, (20, 20, 16), 200, 0);
        let regions = MotionDetector::default().detect(&ops, &frame, &frame)?;
        assert!(regions.is_empty());
        Ok(())
    }

    #[test]
    fn test_regions_tagged_per_threshold_without_merging() -> Result<()> {
        let ops = ScriptedOps::new();
        let previous = frame_with_square(64, 64, (0, 0, 0), 0, 0);
        // Difference of 12 survives levels 5 and 10 only.
        let current = frame_with_square(64, 64, (10, 12, 20), 12, 1);

        let regions = MotionDetector::default().detect(&ops, &previous, &current)?;

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].threshold, 5);
        assert_eq!(regions[1].threshold, 10);
        assert_eq!(regions[0].bbox, BBox::new(10, 12, 20, 20));
        assert_eq!(regions[0].bbox, regions[1].bbox);
        Ok(())
    }

    #[test]
    fn test_small_regions_discarded() -> Result<()> {
        let ops = ScriptedOps::new();
        let previous = frame_with_square(64, 64, (0, 0, 0), 0, 0);
        let current = frame_with_square(64, 64, (30, 30, 9), 255, 1);

        let regions = MotionDetector::default().detect(&ops, &previous, &current)?;
        assert!(regions.is_empty());
        Ok(())
    }

    #[test]
    fn test_custom_sweep() -> Result<()> {
        let ops = ScriptedOps::new();
        let detector = MotionDetector::new(MotionConfig {
            thresholds: vec![40, 100],
            ..Default::default()
        });
        let previous = frame_with_square(64, 64, (0, 0, 0), 0, 0);
        let current = frame_with_square(64, 64, (5, 5, 30), 60, 1);

        let regions = detector.detect(&ops, &previous, &current)?;
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].threshold, 40);
        Ok(())
    }

    #[test]
    fn test_dimension_mismatch_fails_fast() {
        let ops = ScriptedOps::new();
        let previous = frame_with_square(64, 64, (0, 0, 0), 0, 0);
        let current = frame_with_square(32, 64, (0, 0, 0), 0, 1);

        let err = MotionDetector::default()
            .detect(&ops, &previous, &current)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FrameError>(),
            Some(FrameError::DimensionMismatch { .. })
        ));
        assert_eq!(ops.grayscale_calls(), 0);
    }
}
