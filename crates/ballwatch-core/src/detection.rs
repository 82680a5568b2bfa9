//! Per-tick detection results.

use crate::geometry::BBox;
use serde::{Deserialize, Serialize};

/// A bounding box of contiguous change found at one binarization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionRegion {
    pub bbox: BBox,
    /// Threshold (8-bit intensity) whose binarization produced this region.
    pub threshold: u8,
}

impl MotionRegion {
    pub fn new(bbox: BBox, threshold: u8) -> Self {
        Self { bbox, threshold }
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.bbox.contains_point(x, y)
    }
}

/// A detected circular shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Center lies inside at least one motion region.
    pub contained: bool,
}

impl Candidate {
    /// Build a candidate and resolve its containment against `regions`.
    pub fn locate(x: f32, y: f32, radius: f32, regions: &[MotionRegion]) -> Self {
        let contained = regions.iter().any(|region| region.contains_point(x, y));
        Self {
            x,
            y,
            radius,
            contained,
        }
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Largest-radius candidate. Ties resolve to the earliest candidate so the
/// order reported by circle detection is preserved.
pub fn select_best(candidates: &[Candidate]) -> Option<Candidate> {
    candidates.iter().fold(None, |best: Option<Candidate>, c| match best {
        Some(b) if b.radius >= c.radius => Some(b),
        _ => Some(*c),
    })
}

/// Everything one pipeline tick produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Sequence index of the frame this analysis belongs to.
    pub sequence: u64,
    /// False when the tick short-circuited for lack of a previous frame.
    pub analyzed: bool,
    pub regions: Vec<MotionRegion>,
    pub candidates: Vec<Candidate>,
    pub best: Option<Candidate>,
}

impl Analysis {
    /// Result of a tick with nothing to compare against.
    pub fn skipped(sequence: u64) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    pub fn has_motion(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Distinct threshold levels that yielded at least one region, ascending.
    pub fn threshold_levels(&self) -> Vec<u8> {
        let mut levels: Vec<u8> = self.regions.iter().map(|r| r.threshold).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}
