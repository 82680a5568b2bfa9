//! Ballwatch Computer Vision Library
//!
//! Motion-gated ball detection over consecutive frames. Image primitives are
//! reached through the [`traits::ImageOps`] capability; the default backend
//! uses OpenCV.

pub mod detection;
pub mod ops;
pub mod sinks;
pub mod utils;

#[cfg(feature = "opencv")]
pub mod capture;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use detection::{
    DetectionConfig, DetectionPipeline, MotionDetector, MotionGating, ShapeDetector, StillDetection,
};
pub use sinks::{DrawCommand, LogTelemetry, MemoryTelemetry, Overlay, draw_analysis};

#[cfg(feature = "opencv")]
pub use ops::OpenCvOps;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Capabilities the detection pipeline is composed from
pub mod traits {
    use super::*;
    use crate::detection::config::CircleConfig;
    use ballwatch_core::{Analysis, BBox, Frame, SessionState};
    use serde::{Deserialize, Serialize};

    /// A circle as reported by the shape-detection primitive.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct RawCircle {
        pub x: f32,
        pub y: f32,
        pub radius: f32,
    }

    /// Image primitives the pipeline composes but does not implement.
    ///
    /// `Buffer` is the backend's owned image handle; dropping it releases
    /// whatever native memory it holds.
    pub trait ImageOps {
        type Buffer;

        /// Single-channel 8-bit intensity image of an RGBA frame.
        fn grayscale(&self, frame: &Frame) -> Result<Self::Buffer>;

        /// Per-pixel absolute difference of two equally sized buffers.
        fn abs_diff(&self, a: &Self::Buffer, b: &Self::Buffer) -> Result<Self::Buffer>;

        /// Gaussian blur with a square `kernel`; `sigma` 0 derives it from the kernel.
        fn blur(&self, image: &Self::Buffer, kernel: i32, sigma: f64) -> Result<Self::Buffer>;

        /// Binary mask of pixels strictly above `level`.
        fn threshold(&self, image: &Self::Buffer, level: u8) -> Result<Self::Buffer>;

        /// Bounding boxes of the connected foreground regions of a mask.
        fn find_regions(&self, mask: &Self::Buffer) -> Result<Vec<BBox>>;

        /// Circles found in `image`, in the order the detector reports them.
        fn find_circles(
            &self,
            image: &Self::Buffer,
            params: &CircleConfig,
        ) -> Result<Vec<RawCircle>>;
    }

    /// Receives drawing instructions for the current view.
    pub trait VisualizationSink {
        fn draw_rect(&mut self, bbox: &BBox);
        fn draw_circle(&mut self, x: f32, y: f32, radius: f32);
        fn clear(&mut self);
    }

    /// Receives human-readable pipeline events.
    pub trait TelemetrySink {
        fn log(&mut self, message: &str);
    }

    /// One analysis step per tick, as driven by the session scheduler.
    pub trait FrameProcessor {
        /// Analyse `frame` against the state's previous frame, then make
        /// `frame` the previous frame.
        fn process(&mut self, state: &mut SessionState, frame: &Frame) -> Result<Analysis>;

        /// Drop any drawn overlay and return to the plain live view.
        fn reset_view(&mut self);
    }
}
