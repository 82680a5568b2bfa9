//! Deterministic image backend for exercising pipeline logic.

use crate::Result;
use crate::detection::config::CircleConfig;
use crate::traits::{ImageOps, RawCircle};
use anyhow::ensure;
use ballwatch_core::{BBox, Frame};
use std::cell::Cell;

/// Single-channel buffer used by [`ScriptedOps`].
#[derive(Debug, Clone)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Pixel-exact stand-in for the OpenCV backend.
///
/// Grayscale takes the red channel, blur is the identity, and the region
/// finder reports the bounding box of all foreground pixels as one region.
/// Circles are whatever the test scripted.
#[derive(Debug, Default)]
pub struct ScriptedOps {
    circles: Vec<RawCircle>,
    grayscale_calls: Cell<usize>,
    circle_calls: Cell<usize>,
}

impl ScriptedOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circles(mut self, circles: Vec<RawCircle>) -> Self {
        self.circles = circles;
        self
    }

    pub fn grayscale_calls(&self) -> usize {
        self.grayscale_calls.get()
    }

    pub fn circle_calls(&self) -> usize {
        self.circle_calls.get()
    }
}

impl ImageOps for ScriptedOps {
    type Buffer = Plane;

    fn grayscale(&self, frame: &Frame) -> Result<Plane> {
        frame.validate()?;
        self.grayscale_calls.set(self.grayscale_calls.get() + 1);
        Ok(Plane {
            width: frame.width(),
            height: frame.height(),
            data: frame.pixels().chunks_exact(4).map(|px| px[0]).collect(),
        })
    }

    fn abs_diff(&self, a: &Plane, b: &Plane) -> Result<Plane> {
        ensure!(a.data.len() == b.data.len(), "plane sizes differ");
        Ok(Plane {
            width: a.width,
            height: a.height,
            data: a.data.iter().zip(&b.data).map(|(x, y)| x.abs_diff(*y)).collect(),
        })
    }

    fn blur(&self, image: &Plane, _kernel: i32, _sigma: f64) -> Result<Plane> {
        Ok(image.clone())
    }

    fn threshold(&self, image: &Plane, level: u8) -> Result<Plane> {
        Ok(Plane {
            width: image.width,
            height: image.height,
            data: image
                .data
                .iter()
                .map(|&v| if v > level { 255 } else { 0 })
                .collect(),
        })
    }

    fn find_regions(&self, mask: &Plane) -> Result<Vec<BBox>> {
        let width = mask.width as usize;
        let mut bounds: Option<(i32, i32, i32, i32)> = None;

        for (idx, _) in mask.data.iter().enumerate().filter(|(_, v)| **v > 0) {
            let (x, y) = ((idx % width) as i32, (idx / width) as i32);
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        Ok(bounds
            .map(|(x0, y0, x1, y1)| vec![BBox::from_corners(x0, y0, x1, y1)])
            .unwrap_or_default())
    }

    fn find_circles(&self, _image: &Plane, _params: &CircleConfig) -> Result<Vec<RawCircle>> {
        self.circle_calls.set(self.circle_calls.get() + 1);
        Ok(self.circles.clone())
    }
}

/// Black RGBA frame with a `side`-pixel square of gray `value` whose top-left
/// corner is at `(x, y)`. A zero side draws nothing.
pub fn frame_with_square(
    width: u32,
    height: u32,
    (x, y, side): (u32, u32, u32),
    value: u8,
    sequence: u64,
) -> Frame {
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    for py in y..(y + side).min(height) {
        for px in x..(x + side).min(width) {
            let idx = (py as usize * width as usize + px as usize) * 4;
            pixels[idx..idx + 3].fill(value);
        }
    }
    for alpha in pixels.iter_mut().skip(3).step_by(4) {
        *alpha = 255;
    }
    Frame::from_rgba(width, height, pixels, sequence)
}
