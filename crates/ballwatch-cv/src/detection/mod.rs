//! Motion-gated ball detection

pub mod config;
pub mod motion;
pub mod pipeline;
pub mod shapes;

pub use config::{CircleConfig, DetectionConfig, MotionConfig, MotionGating, SessionConfig};
pub use motion::MotionDetector;
pub use pipeline::{DetectionPipeline, PipelineStats, StillDetection, export_json};
pub use shapes::ShapeDetector;
