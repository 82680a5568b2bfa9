//! Detection configuration

use crate::Result;
use anyhow::{Context, ensure};
use ballwatch_core::FacingMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub motion: MotionConfig,
    pub circles: CircleConfig,
    pub gating: MotionGating,
    pub session: SessionConfig,
}

/// Frame differencing and threshold sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Binarization levels on the 8-bit scale, evaluated independently.
    pub thresholds: Vec<u8>,
    /// Square Gaussian kernel applied to the difference image (odd).
    pub blur_kernel: i32,
    /// Regions narrower or shorter than this are discarded.
    pub min_region_size: i32,
}

/// Hough circle detection profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    pub blur_kernel: i32,
    pub blur_sigma: f64,
    /// Inverse accumulator resolution ratio.
    pub dp: f64,
    /// Minimum distance between detected centers.
    pub min_distance: f64,
    /// Upper Canny threshold used by the gradient method.
    pub canny_threshold: f64,
    /// Accumulator votes required for a center.
    pub accumulator_threshold: f64,
    pub min_radius: i32,
    pub max_radius: i32,
}

/// Whether shape candidates must sit inside a motion region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionGating {
    #[default]
    Enabled,
    Disabled,
}

/// Capture cadence and device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tick_interval_ms: u64,
    pub facing_mode: FacingMode,
    /// Device index opened for [`FacingMode::Environment`]; the user-facing
    /// camera is the next index.
    pub device_index: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![5, 10, 15, 20],
            blur_kernel: 5,
            min_region_size: 10,
        }
    }
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 9,
            blur_sigma: 2.0,
            dp: 1.0,
            min_distance: 30.0,
            canny_threshold: 100.0,
            accumulator_threshold: 30.0,
            min_radius: 5,
            max_radius: 100,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            facing_mode: FacingMode::Environment,
            device_index: 0,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::close_range()
    }
}

impl DetectionConfig {
    /// Ball close to the camera: radii up to 100 px.
    pub fn close_range() -> Self {
        Self {
            motion: MotionConfig::default(),
            circles: CircleConfig::default(),
            gating: MotionGating::Enabled,
            session: SessionConfig::default(),
        }
    }

    /// Ball far from the camera: radii up to 30 px.
    pub fn far_field() -> Self {
        Self {
            circles: CircleConfig {
                max_radius: 30,
                ..Default::default()
            },
            ..Self::close_range()
        }
    }

    /// Profile for stand-alone images: no motion gating.
    pub fn still_image() -> Self {
        Self {
            gating: MotionGating::Disabled,
            ..Self::close_range()
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))
    }

    /// Reject settings the image primitives cannot honour.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.motion.thresholds.is_empty(), "threshold sweep is empty");
        ensure!(
            is_odd_positive(self.motion.blur_kernel),
            "motion blur kernel must be odd and positive, got {}",
            self.motion.blur_kernel
        );
        ensure!(self.motion.min_region_size > 0, "minimum region size must be positive");
        ensure!(
            is_odd_positive(self.circles.blur_kernel),
            "circle blur kernel must be odd and positive, got {}",
            self.circles.blur_kernel
        );
        ensure!(
            0 <= self.circles.min_radius && self.circles.min_radius <= self.circles.max_radius,
            "invalid radius range {}..{}",
            self.circles.min_radius,
            self.circles.max_radius
        );
        ensure!(self.circles.dp > 0.0, "dp must be positive");
        ensure!(self.session.tick_interval_ms > 0, "tick interval must be positive");
        Ok(())
    }

    pub fn gating_enabled(&self) -> bool {
        self.gating == MotionGating::Enabled
    }
}

fn is_odd_positive(kernel: i32) -> bool {
    kernel > 0 && kernel % 2 == 1
}
