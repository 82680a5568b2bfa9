//! Per-tick motion-gated ball detection

use super::config::{DetectionConfig, MotionGating};
use super::motion::MotionDetector;
use super::shapes::ShapeDetector;
use crate::Result;
use crate::sinks::{LogTelemetry, Overlay, draw_analysis};
use crate::traits::{FrameProcessor, ImageOps, TelemetrySink, VisualizationSink};
use anyhow::Context;
use ballwatch_core::{Analysis, Candidate, Frame, SessionState, select_best};
use log::debug;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of analysing a single image without motion gating.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StillDetection {
    pub candidates: Vec<Candidate>,
    pub best: Option<Candidate>,
}

/// Running counters over every processed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub frames: u64,
    pub analyzed: u64,
    pub with_motion: u64,
    pub with_ball: u64,
    pub total_processing: Duration,
}

/// Motion detector and shape gate composed over one image backend, with the
/// visualization and telemetry sinks each tick reports to.
pub struct DetectionPipeline<O, V = Overlay, T = LogTelemetry> {
    ops: O,
    motion: MotionDetector,
    shapes: ShapeDetector,
    canvas: V,
    telemetry: T,
    stats: PipelineStats,
}

impl<O: ImageOps> DetectionPipeline<O> {
    /// Pipeline drawing into an [`Overlay`] and logging through `log`.
    pub fn with_defaults(ops: O, config: &DetectionConfig) -> Result<Self> {
        Self::new(ops, config, Overlay::new(), LogTelemetry::new())
    }
}

impl<O, V, T> DetectionPipeline<O, V, T>
where
    O: ImageOps,
    V: VisualizationSink,
    T: TelemetrySink,
{
    pub fn new(ops: O, config: &DetectionConfig, canvas: V, telemetry: T) -> Result<Self> {
        config.validate().context("Invalid detection config")?;

        Ok(Self {
            ops,
            motion: MotionDetector::new(config.motion.clone()),
            shapes: ShapeDetector::new(config.circles.clone(), config.gating),
            canvas,
            telemetry,
            stats: PipelineStats::default(),
        })
    }

    /// Analyse `frame` against the session's previous frame.
    ///
    /// The first frame of a session has no predecessor and yields an empty,
    /// unanalysed result. Whatever happens, `frame` becomes the session's
    /// previous frame before this returns.
    pub fn process(&mut self, state: &mut SessionState, frame: &Frame) -> Result<Analysis> {
        let start = Instant::now();

        let outcome = match state.previous_frame() {
            Some(previous) => self.analyze(previous, frame),
            None => {
                self.canvas.clear();
                Ok(Analysis::skipped(frame.sequence()))
            }
        };
        state.replace_previous(frame.clone());

        let analysis = outcome?;
        self.record(&analysis, start.elapsed());
        Ok(analysis)
    }

    /// Circle detection over a whole stand-alone image. Never touches session
    /// state.
    pub fn detect_still(&mut self, frame: &Frame) -> Result<StillDetection> {
        frame.validate()?;

        let candidates = self.shapes.ungated().detect_in_frame(&self.ops, frame, &[])?;
        let best = select_best(&candidates);

        self.canvas.clear();
        for c in &candidates {
            self.canvas.draw_circle(c.x, c.y, c.radius);
        }

        if candidates.is_empty() {
            self.telemetry.log("no circles detected");
        } else {
            self.telemetry
                .log(&format!("{} circle(s) detected", candidates.len()));
        }

        Ok(StillDetection { candidates, best })
    }

    fn analyze(&mut self, previous: &Frame, frame: &Frame) -> Result<Analysis> {
        let regions = self
            .motion
            .detect(&self.ops, previous, frame)
            .with_context(|| format!("Motion detection failed on frame {}", frame.sequence()))?;

        // Gated detection keeps nothing without a region to fall in.
        let candidates = if regions.is_empty() && self.shapes.gating() == MotionGating::Enabled {
            Vec::new()
        } else {
            self.shapes.detect_in_frame(&self.ops, frame, &regions)?
        };
        let best = select_best(&candidates);

        let analysis = Analysis {
            sequence: frame.sequence(),
            analyzed: true,
            regions,
            candidates,
            best,
        };

        self.report(&analysis);
        self.draw(&analysis);
        Ok(analysis)
    }

    fn report(&mut self, analysis: &Analysis) {
        if analysis.has_motion() {
            self.telemetry.log(&format!(
                "motion: {} region(s) at threshold(s) {:?}",
                analysis.regions.len(),
                analysis.threshold_levels()
            ));
        } else {
            self.telemetry.log("no motion detected");
        }

        if let Some(best) = analysis.best {
            self.telemetry.log(&format!(
                "ball: best candidate at ({:.1}, {:.1}) r={:.1}",
                best.x, best.y, best.radius
            ));
        }
    }

    fn draw(&mut self, analysis: &Analysis) {
        self.canvas.clear();
        draw_analysis(&mut self.canvas, analysis);
    }

    fn record(&mut self, analysis: &Analysis, elapsed: Duration) {
        self.stats.frames += 1;
        self.stats.total_processing += elapsed;
        if analysis.analyzed {
            self.stats.analyzed += 1;
        }
        if analysis.has_motion() {
            self.stats.with_motion += 1;
        }
        if analysis.best.is_some() {
            self.stats.with_ball += 1;
        }
        debug!(
            "frame {}: {} region(s), {} candidate(s) in {:?}",
            analysis.sequence,
            analysis.regions.len(),
            analysis.candidates.len(),
            elapsed
        );
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn canvas(&self) -> &V {
        &self.canvas
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}

impl<O, V, T> FrameProcessor for DetectionPipeline<O, V, T>
where
    O: ImageOps,
    V: VisualizationSink,
    T: TelemetrySink,
{
    fn process(&mut self, state: &mut SessionState, frame: &Frame) -> Result<Analysis> {
        DetectionPipeline::process(self, state, frame)
    }

    fn reset_view(&mut self) {
        self.canvas.clear();
    }
}

/// Write per-tick results as pretty JSON.
pub fn export_json(analyses: &[Analysis], output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(analyses).context("Failed to serialize detection results")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

    Ok(())
}
