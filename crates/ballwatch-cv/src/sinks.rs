//! Visualization and telemetry sinks

use crate::traits::{TelemetrySink, VisualizationSink};
use ballwatch_core::{Analysis, BBox};
use log::info;
use serde::{Deserialize, Serialize};

/// A single drawing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Rect(BBox),
    Circle { x: f32, y: f32, radius: f32 },
}

/// Retained drawing layer for the current frame.
///
/// Commands accumulate until the next `clear`; a renderer (see
/// `ops::opencv::render_overlay`) turns them into pixels.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    commands: Vec<DrawCommand>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The layer a tick's analysis draws, independent of any live canvas.
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut overlay = Self::new();
        draw_analysis(&mut overlay, analysis);
        overlay
    }
}

/// Draw every motion box, then every retained circle, on top of whatever
/// `sink` already holds.
pub fn draw_analysis<V: VisualizationSink + ?Sized>(sink: &mut V, analysis: &Analysis) {
    for region in &analysis.regions {
        sink.draw_rect(&region.bbox);
    }
    for c in &analysis.candidates {
        sink.draw_circle(c.x, c.y, c.radius);
    }
}

impl VisualizationSink for Overlay {
    fn draw_rect(&mut self, bbox: &BBox) {
        self.commands.push(DrawCommand::Rect(*bbox));
    }

    fn draw_circle(&mut self, x: f32, y: f32, radius: f32) {
        self.commands.push(DrawCommand::Circle { x, y, radius });
    }

    fn clear(&mut self) {
        self.commands.clear();
    }
}

/// Forwards telemetry to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl LogTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for LogTelemetry {
    fn log(&mut self, message: &str) {
        info!("{}", message);
    }
}

/// Keeps every message, for inspection or later display.
#[derive(Debug, Clone, Default)]
pub struct MemoryTelemetry {
    messages: Vec<String>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn log(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
