//! Immutable video frame shared by capture, archive and playback.

use std::sync::Arc;
use thiserror::Error;

/// Bytes per pixel of the RGBA layout every frame uses.
pub const CHANNELS: usize = 4;

/// Reasons a frame cannot be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame {sequence} has zero dimension ({width}x{height})")]
    Empty { sequence: u64, width: u32, height: u32 },

    #[error("frame {sequence} carries {actual} bytes, expected {expected}")]
    BufferSize {
        sequence: u64,
        expected: usize,
        actual: usize,
    },

    #[error("frame dimensions differ: {previous:?} vs {current:?}")]
    DimensionMismatch {
        previous: (u32, u32),
        current: (u32, u32),
    },
}

/// One RGBA video frame.
///
/// The pixel buffer is reference counted so the archive, the pipeline's
/// previous-frame slot and the caller can all hold the same frame without
/// copying it.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    sequence: u64,
}

impl Frame {
    /// Wrap a raw RGBA buffer. No validation happens here; sources that
    /// hand out broken buffers are caught by [`Frame::validate`] at tick time.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>, sequence: u64) -> Self {
        Self {
            pixels: pixels.into(),
            width,
            height,
            sequence,
        }
    }

    /// Uniformly filled frame, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4], sequence: u64) -> Self {
        let count = width as usize * height as usize;
        let pixels = rgba.iter().copied().cycle().take(count * CHANNELS).collect();
        Self::from_rgba(width, height, pixels, sequence)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.pixels.get(idx..idx + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Check the frame is analysable: non-zero size and a buffer that
    /// matches the declared dimensions.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::Empty {
                sequence: self.sequence,
                width: self.width,
                height: self.height,
            });
        }

        let expected = self.pixel_count() * CHANNELS;
        if self.pixels.len() != expected {
            return Err(FrameError::BufferSize {
                sequence: self.sequence,
                expected,
                actual: self.pixels.len(),
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Fail fast when two frames cannot be compared pixel by pixel.
    pub fn ensure_same_dimensions(&self, other: &Frame) -> Result<(), FrameError> {
        if self.dimensions() != other.dimensions() {
            return Err(FrameError::DimensionMismatch {
                previous: self.dimensions(),
                current: other.dimensions(),
            });
        }
        Ok(())
    }

    /// Same pixels under a new sequence index.
    pub fn with_sequence(&self, sequence: u64) -> Self {
        Self {
            pixels: Arc::clone(&self.pixels),
            width: self.width,
            height: self.height,
            sequence,
        }
    }

    /// True when both frames share the same pixel allocation.
    pub fn shares_pixels(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}
