use anyhow::{Context, Result};
use ballwatch::SyntheticBallSource;
use ballwatch::session::{SessionScheduler, SystemClock, TickDriver, TickOutcome};
use ballwatch_core::{Analysis, FrameSource};
use ballwatch_cv::capture::CameraSource;
use ballwatch_cv::detection::{DetectionConfig, export_json};
use ballwatch_cv::ops::render_overlay;
use ballwatch_cv::utils::ImageUtils;
use ballwatch_cv::{DetectionPipeline, OpenCvOps, Overlay};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Pipeline = DetectionPipeline<OpenCvOps>;

#[derive(Parser)]
#[command(name = "ballwatch", version, about = "Motion-gated ball detection")]
struct Cli {
    /// Detection config as JSON; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write every analysed frame's result to this JSON file
    #[arg(long, global = true)]
    json: Option<PathBuf>,

    /// Save frames with their overlay drawn into this directory
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the camera, then replay the recording
    Live {
        /// Capture ticks before recording stops
        #[arg(short, long, default_value_t = 50)]
        frames: usize,
    },
    /// Record a generated bouncing ball, then replay it
    Demo {
        #[arg(short, long, default_value_t = 30)]
        frames: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Background noise amplitude
        #[arg(long, default_value_t = 0)]
        noise: u8,
    },
    /// Replay a directory of previously exported frames
    Replay { dir: PathBuf },
    /// Detect circles in a single image
    Still { image: PathBuf },
}

/// Gathers per-tick results and writes overlay images.
struct Collector {
    analyses: Vec<Analysis>,
    output_dir: Option<PathBuf>,
    pass: &'static str,
}

impl Collector {
    fn new(output_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = &output_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        }
        Ok(Self {
            analyses: Vec::new(),
            output_dir,
            pass: "record",
        })
    }

    fn observe<S: FrameSource>(
        &mut self,
        scheduler: &SessionScheduler<S, Pipeline>,
        outcome: &TickOutcome,
    ) -> Result<()> {
        let Some(analysis) = outcome.analysis() else {
            return Ok(());
        };

        // The live canvas is already reset on the tick that ends playback, so
        // draw from the analysis itself.
        let frame = scheduler.state().previous_frame();
        if let (Some(dir), Some(frame)) = (&self.output_dir, frame) {
            let drawn = render_overlay(frame, &Overlay::from_analysis(analysis))?;
            let path = dir.join(format!("{}-{:05}.png", self.pass, analysis.sequence));
            ImageUtils::save_frame(&drawn, path)?;
        }

        self.analyses.push(analysis.clone());
        Ok(())
    }

    fn finish(&self, json: Option<&Path>) -> Result<()> {
        let with_ball = self.analyses.iter().filter(|a| a.best.is_some()).count();
        info!(
            "{} frame(s) processed, ball found in {}",
            self.analyses.len(),
            with_ball
        );

        if let Some(path) = json {
            export_json(&self.analyses, path)?;
            info!("results written to {:?}", path);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DetectionConfig::from_json_file(path)?,
        None => DetectionConfig::default(),
    };

    let mut collector = Collector::new(cli.output_dir.clone())?;

    match cli.command {
        Command::Live { frames } => {
            let camera = CameraSource::new(config.session.device_index);
            record_and_replay(camera, &config, frames, &mut collector)?;
        }
        Command::Demo {
            frames,
            seed,
            noise,
        } => {
            let source = SyntheticBallSource::new(320, 240)
                .with_noise(noise, seed)
                .with_limit(frames as u64);
            record_and_replay(source, &config, frames, &mut collector)?;
        }
        Command::Replay { dir } => {
            let frames = ImageUtils::load_frames_from_dir(&dir)?;
            info!("loaded {} frame(s) from {:?}", frames.len(), dir);

            // The camera is never opened: playback reads from the archive only.
            let camera = CameraSource::new(config.session.device_index);
            let mut scheduler = scheduler(camera, &config)?;
            scheduler.load_archive(frames)?;
            replay(&mut scheduler, &config, &mut collector)?;
            report(&scheduler)?;
        }
        Command::Still { image } => {
            return still(&image, &config, cli.output_dir.as_deref(), cli.json.as_deref());
        }
    }

    collector.finish(cli.json.as_deref())
}

fn scheduler<S: FrameSource>(
    source: S,
    config: &DetectionConfig,
) -> Result<SessionScheduler<S, Pipeline>> {
    let pipeline = DetectionPipeline::with_defaults(OpenCvOps::new(), config)?;
    Ok(SessionScheduler::new(source, pipeline, &config.session))
}

fn driver(config: &DetectionConfig) -> TickDriver<SystemClock> {
    TickDriver::new(
        SystemClock,
        Duration::from_millis(config.session.tick_interval_ms),
    )
}

fn record_and_replay<S: FrameSource>(
    source: S,
    config: &DetectionConfig,
    frames: usize,
    collector: &mut Collector,
) -> Result<()> {
    let mut scheduler = scheduler(source, config)?;
    scheduler.start().context("Could not start recording")?;

    collector.pass = "record";
    driver(config).run(&mut scheduler, Some(frames), |s, outcome| {
        collector.observe(s, outcome)
    })?;

    if !scheduler.stop() {
        warn!("nothing was recorded");
        scheduler.shutdown();
        return report(&scheduler);
    }

    replay(&mut scheduler, config, collector)?;
    scheduler.shutdown();
    report(&scheduler)
}

fn replay<S: FrameSource>(
    scheduler: &mut SessionScheduler<S, Pipeline>,
    config: &DetectionConfig,
    collector: &mut Collector,
) -> Result<()> {
    scheduler.play()?;
    collector.pass = "replay";
    driver(config).run(scheduler, None, |s, outcome| collector.observe(s, outcome))?;
    Ok(())
}

fn report<S: FrameSource>(scheduler: &SessionScheduler<S, Pipeline>) -> Result<()> {
    let stats = serde_json::json!({
        "ticks": scheduler.stats(),
        "pipeline": scheduler.processor().stats(),
    });
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn still(
    path: &Path,
    config: &DetectionConfig,
    output_dir: Option<&Path>,
    json: Option<&Path>,
) -> Result<()> {
    let frame = ImageUtils::load_frame(path, 0)?;
    let mut pipeline = DetectionPipeline::with_defaults(OpenCvOps::new(), config)?;
    let detection = pipeline.detect_still(&frame)?;

    match detection.best {
        Some(best) => info!(
            "best circle at ({:.1}, {:.1}) r={:.1}",
            best.x, best.y, best.radius
        ),
        None => info!("no circle found in {:?}", path),
    }

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        let drawn = render_overlay(&frame, pipeline.canvas())?;
        ImageUtils::save_frame(&drawn, dir.join("still.png"))?;
    }

    let output = serde_json::to_string_pretty(&detection)?;
    match json {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("Failed to write JSON to: {:?}", path))?,
        None => println!("{}", output),
    }
    Ok(())
}
