//! Capture and playback scheduling over one session

use ballwatch_core::{
    Analysis, FacingMode, Frame, FrameError, FrameSource, Mode, SessionError, SessionState, Ticket,
};
use ballwatch_cv::Result;
use ballwatch_cv::detection::SessionConfig;
use ballwatch_cv::traits::FrameProcessor;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Why a tick did no analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The source had nothing ready.
    NoFrame,
    /// The source failed for this tick only.
    SourceFailed(String),
    /// Zero-sized or truncated frame; never archived or analysed.
    InvalidFrame(FrameError),
    /// The processor rejected the frame; it is not archived.
    ProcessingFailed(String),
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No capture or playback is running.
    Idle,
    Processed(Analysis),
    Skipped(SkipReason),
    /// The frame belonged to a session state that no longer exists.
    Stale,
}

impl TickOutcome {
    pub fn analysis(&self) -> Option<&Analysis> {
        match self {
            TickOutcome::Processed(analysis) => Some(analysis),
            _ => None,
        }
    }
}

/// Counters over every tick the scheduler ran
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickStats {
    pub ticks: u64,
    pub captured: u64,
    pub replayed: u64,
    pub analyzed: u64,
    pub skipped: u64,
    pub stale: u64,
    pub deadline_misses: u64,
    pub worst_case: Duration,
}

/// Owns the session state and drives the frame processor once per tick,
/// from the live source while recording and from the archive while playing.
pub struct SessionScheduler<S, P> {
    source: S,
    processor: P,
    state: SessionState,
    facing: FacingMode,
    frame_budget: Duration,
    stats: TickStats,
}

impl<S, P> SessionScheduler<S, P>
where
    S: FrameSource,
    P: FrameProcessor,
{
    pub fn new(source: S, processor: P, config: &SessionConfig) -> Self {
        Self {
            source,
            processor,
            state: SessionState::new(),
            facing: config.facing_mode,
            frame_budget: Duration::from_millis(config.tick_interval_ms),
            stats: TickStats::default(),
        }
    }

    /// Begin a fresh recording. The source is acquired on first use; failure
    /// to acquire is returned as is and leaves the session untouched.
    pub fn start(&mut self) -> std::result::Result<(), SessionError> {
        if !self.source.is_acquired() {
            self.source.acquire(self.facing)?;
        }

        self.state.begin_recording();
        self.processor.reset_view();
        info!("recording started");
        Ok(())
    }

    /// Stop recording or cancel playback. Returns whether playback is
    /// available afterwards.
    pub fn stop(&mut self) -> bool {
        let was = self.state.mode();
        let available = self.state.stop();
        if was == Mode::Recording {
            info!(
                "recording stopped: {} frame(s), playback {}",
                self.state.archive().len(),
                if available { "available" } else { "unavailable" }
            );
        } else if was == Mode::Playing {
            self.processor.reset_view();
            info!("playback cancelled");
        }
        available
    }

    /// Replay the archive from the start. Recording in progress is stopped
    /// first.
    pub fn play(&mut self) -> std::result::Result<(), SessionError> {
        if self.state.mode() == Mode::Recording {
            self.stop();
        }
        self.state.begin_playback()?;
        self.processor.reset_view();
        info!("playback started: {} frame(s)", self.state.archive().len());
        Ok(())
    }

    /// Seed the archive from outside, e.g. previously exported frames.
    pub fn load_archive<I>(&mut self, frames: I) -> std::result::Result<usize, SessionError>
    where
        I: IntoIterator<Item = Frame>,
    {
        self.state.load_archive(frames)
    }

    /// Run one capture or playback step.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let start = Instant::now();

        let outcome = match self.state.mode() {
            Mode::Idle => return Ok(TickOutcome::Idle),
            Mode::Recording => self.capture_tick(),
            Mode::Playing => self.playback_tick(),
        };

        self.account(start.elapsed());
        outcome
    }

    /// Hand in a frame acquired under `ticket`. Frames whose ticket predates
    /// the current session state are discarded without touching anything.
    /// Only frames the processor accepted are archived.
    pub fn submit(&mut self, ticket: Ticket, frame: Frame) -> Result<TickOutcome> {
        if !self.state.is_current(ticket) {
            debug!("discarding stale frame {}", frame.sequence());
            self.stats.stale += 1;
            return Ok(TickOutcome::Stale);
        }

        if let Err(e) = frame.validate() {
            warn!("skipping tick: {}", e);
            self.stats.skipped += 1;
            return Ok(TickOutcome::Skipped(SkipReason::InvalidFrame(e)));
        }

        if ticket.mode == Mode::Idle {
            return Ok(TickOutcome::Idle);
        }

        let analysis = match self.processor.process(&mut self.state, &frame) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("skipping frame {}: {:#}", frame.sequence(), e);
                self.stats.skipped += 1;
                return Ok(TickOutcome::Skipped(SkipReason::ProcessingFailed(format!(
                    "{:#}",
                    e
                ))));
            }
        };

        if ticket.mode == Mode::Recording {
            self.state.append(frame)?;
            self.stats.captured += 1;
        } else {
            self.stats.replayed += 1;
        }

        if analysis.analyzed {
            self.stats.analyzed += 1;
        }
        Ok(TickOutcome::Processed(analysis))
    }

    fn capture_tick(&mut self) -> Result<TickOutcome> {
        let ticket = self.state.ticket();

        match self.source.sample() {
            Ok(Some(frame)) => self.submit(ticket, frame),
            Ok(None) => {
                self.stats.skipped += 1;
                Ok(TickOutcome::Skipped(SkipReason::NoFrame))
            }
            Err(e) => {
                warn!("frame source failed: {:#}", e);
                self.stats.skipped += 1;
                Ok(TickOutcome::Skipped(SkipReason::SourceFailed(format!("{:#}", e))))
            }
        }
    }

    fn playback_tick(&mut self) -> Result<TickOutcome> {
        let ticket = self.state.ticket();

        let outcome = match self.state.next_playback_frame() {
            Some(frame) => self.submit(ticket, frame),
            None => Ok(TickOutcome::Idle),
        };

        if self.state.mode() == Mode::Playing && self.state.playback_exhausted() {
            self.complete_playback();
        }
        outcome
    }

    fn complete_playback(&mut self) {
        self.state.finish_playback();
        self.processor.reset_view();
        info!("playback complete");
    }

    fn account(&mut self, elapsed: Duration) {
        self.stats.ticks += 1;
        if elapsed > self.frame_budget {
            self.stats.deadline_misses += 1;
        }
        if elapsed > self.stats.worst_case {
            self.stats.worst_case = elapsed;
        }
    }

    /// Stop whatever is running and release the source.
    pub fn shutdown(&mut self) {
        self.stop();
        self.source.release();
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn ticket(&self) -> Ticket {
        self.state.ticket()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}
