//! Axis-aligned bounding boxes in pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned box with its top-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box covering both corner points (inclusive).
    pub fn from_corners(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        Self::new(left, top, right - left + 1, bottom - top + 1)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Both sides at least `min_side` pixels.
    pub fn meets_min_size(&self, min_side: i32) -> bool {
        self.width >= min_side && self.height >= min_side
    }

    /// Point containment, edges included.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && x <= self.right() as f32
            && y >= self.y as f32
            && y <= self.bottom() as f32
    }

    /// True when `other` lies entirely inside this box.
    pub fn encloses(&self, other: &BBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BBox::new(x, y, right - x, bottom - y)
    }

    /// Grow the box by `margin` pixels on every side.
    pub fn inflate(&self, margin: i32) -> BBox {
        BBox::new(
            self.x - margin,
            self.y - margin,
            self.width + 2 * margin,
            self.height + 2 * margin,
        )
    }
}
