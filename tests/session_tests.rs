// tests/session_tests.rs
use anyhow::{Result, anyhow};
use ballwatch::session::{ManualClock, SessionScheduler, SkipReason, TickDriver, TickOutcome};
use ballwatch_core::{
    Analysis, BBox, FacingMode, Frame, FrameError, FrameSource, Mode, MotionRegion, SessionError,
    SessionState, SourceError,
};
use ballwatch_cv::detection::SessionConfig;
use ballwatch_cv::traits::FrameProcessor;
use ballwatch_cv::utils::ImageUtils;
use ballwatch_cv::{DrawCommand, Overlay};
use std::collections::VecDeque;
use std::time::Duration;

/// Hands out a fixed script of per-tick samples.
struct ScriptedSource {
    samples: VecDeque<Result<Option<Frame>>>,
    deny: bool,
    acquired: bool,
    acquisitions: usize,
}

impl ScriptedSource {
    fn new(samples: Vec<Result<Option<Frame>>>) -> Self {
        Self {
            samples: samples.into(),
            deny: false,
            acquired: false,
            acquisitions: 0,
        }
    }

    fn frames(count: u64) -> Self {
        Self::new((0..count).map(|seq| Ok(Some(frame(seq)))).collect())
    }

    fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(Vec::new())
        }
    }
}

impl FrameSource for ScriptedSource {
    fn acquire(&mut self, _facing: FacingMode) -> Result<(), SourceError> {
        self.acquisitions += 1;
        if self.deny {
            return Err(SourceError::AccessDenied);
        }
        self.acquired = true;
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }

    fn sample(&mut self) -> Result<Option<Frame>> {
        self.samples.pop_front().unwrap_or(Ok(None))
    }

    fn release(&mut self) {
        self.acquired = false;
    }
}

/// Records what it was asked to process. Whenever a previous frame exists
/// it reports one full-frame region, and it fails on a size change the way
/// the detection pipeline does.
#[derive(Default)]
struct RecordingProcessor {
    seen: Vec<u64>,
    resets: usize,
}

impl FrameProcessor for RecordingProcessor {
    fn process(&mut self, state: &mut SessionState, frame: &Frame) -> Result<Analysis> {
        let previous = state.replace_previous(frame.clone());
        self.seen.push(frame.sequence());

        let Some(previous) = previous else {
            return Ok(Analysis::skipped(frame.sequence()));
        };
        previous.ensure_same_dimensions(frame)?;

        let (width, height) = frame.dimensions();
        Ok(Analysis {
            analyzed: true,
            regions: vec![MotionRegion::new(
                BBox::new(0, 0, width as i32, height as i32),
                5,
            )],
            ..Analysis::skipped(frame.sequence())
        })
    }

    fn reset_view(&mut self) {
        self.resets += 1;
    }
}

type Scheduler = SessionScheduler<ScriptedSource, RecordingProcessor>;

fn frame(seq: u64) -> Frame {
    Frame::filled(8, 8, [seq as u8, 0, 0, 255], seq)
}

fn scheduler(source: ScriptedSource) -> Scheduler {
    SessionScheduler::new(source, RecordingProcessor::default(), &SessionConfig::default())
}

fn run_ticks(scheduler: &mut Scheduler, count: usize) -> Result<Vec<TickOutcome>> {
    (0..count).map(|_| scheduler.tick()).collect()
}

fn run_until_idle(scheduler: &mut Scheduler) -> Result<Vec<TickOutcome>> {
    let mut outcomes = Vec::new();
    while scheduler.mode() != Mode::Idle {
        outcomes.push(scheduler.tick()?);
    }
    Ok(outcomes)
}

#[test]
fn test_archive_holds_every_captured_frame() -> Result<()> {
    let mut samples: Vec<_> = (0..5).map(|seq| Ok(Some(frame(seq)))).collect();
    samples.insert(2, Ok(None));
    let mut scheduler = scheduler(ScriptedSource::new(samples));

    scheduler.start()?;
    let outcomes = run_ticks(&mut scheduler, 6)?;

    assert_eq!(outcomes[2], TickOutcome::Skipped(SkipReason::NoFrame));
    assert!(scheduler.stop());
    assert_eq!(scheduler.mode(), Mode::Idle);

    let sequences: Vec<u64> = scheduler.state().archive().iter().map(|f| f.sequence()).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    assert_eq!(scheduler.processor().seen, vec![0, 1, 2, 3, 4]);

    let stats = scheduler.stats();
    assert_eq!((stats.ticks, stats.captured, stats.skipped), (6, 5, 1));
    assert_eq!(stats.analyzed, 4);
    Ok(())
}

#[test]
fn test_invalid_frames_and_source_errors_are_skipped() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::new(vec![
        Ok(Some(frame(0))),
        Ok(Some(Frame::from_rgba(0, 0, Vec::new(), 1))),
        Ok(Some(Frame::from_rgba(8, 8, vec![0; 3], 2))),
        Err(anyhow!("usb hiccup")),
        Ok(Some(frame(4))),
    ]));

    scheduler.start()?;
    let outcomes = run_ticks(&mut scheduler, 5)?;

    assert!(matches!(
        outcomes[1],
        TickOutcome::Skipped(SkipReason::InvalidFrame(FrameError::Empty { .. }))
    ));
    assert!(matches!(
        outcomes[2],
        TickOutcome::Skipped(SkipReason::InvalidFrame(FrameError::BufferSize { .. }))
    ));
    assert!(matches!(
        outcomes[3],
        TickOutcome::Skipped(SkipReason::SourceFailed(ref msg)) if msg.contains("usb hiccup")
    ));

    // The session kept recording, and the last frame compared against frame 0.
    assert_eq!(scheduler.mode(), Mode::Recording);
    assert_eq!(outcomes[4].analysis().map(|a| a.analyzed), Some(true));
    assert_eq!(scheduler.state().archive().len(), 2);
    assert_eq!(scheduler.processor().seen, vec![0, 4]);
    Ok(())
}

#[test]
fn test_replay_of_n_frames_analyzes_n_minus_one() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(4));
    scheduler.start()?;
    run_ticks(&mut scheduler, 4)?;
    scheduler.play()?;

    assert_eq!(scheduler.mode(), Mode::Playing);
    assert!(scheduler.state().previous_frame().is_none());

    let outcomes = run_until_idle(&mut scheduler)?;

    assert_eq!(outcomes.len(), 4);
    let analyzed: Vec<bool> = outcomes
        .iter()
        .filter_map(|o| o.analysis().map(|a| a.analyzed))
        .collect();
    assert_eq!(analyzed, vec![false, true, true, true]);

    assert_eq!(scheduler.mode(), Mode::Idle);
    assert_eq!(scheduler.state().playback_cursor(), 0);
    assert_eq!(scheduler.state().archive().len(), 4);
    assert_eq!(scheduler.stats().replayed, 4);
    assert_eq!(scheduler.tick()?, TickOutcome::Idle);
    Ok(())
}

#[test]
fn test_play_while_recording_matches_stop_then_play() -> Result<()> {
    let mut stopped = scheduler(ScriptedSource::frames(3));
    stopped.start()?;
    run_ticks(&mut stopped, 3)?;
    stopped.stop();
    stopped.play()?;
    let after_stop = run_until_idle(&mut stopped)?;

    let mut direct = scheduler(ScriptedSource::frames(3));
    direct.start()?;
    run_ticks(&mut direct, 3)?;
    direct.play()?;
    let after_play = run_until_idle(&mut direct)?;

    assert_eq!(after_stop, after_play);
    assert_eq!(stopped.processor().seen, direct.processor().seen);
    Ok(())
}

#[test]
fn test_play_without_archive_is_unavailable() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::new(vec![Ok(None)]));
    assert!(matches!(scheduler.play(), Err(SessionError::PlaybackUnavailable)));

    scheduler.start()?;
    run_ticks(&mut scheduler, 1)?;
    assert!(!scheduler.stop());
    assert!(matches!(scheduler.play(), Err(SessionError::PlaybackUnavailable)));
    assert_eq!(scheduler.mode(), Mode::Idle);
    Ok(())
}

#[test]
fn test_start_resets_session_from_any_mode() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(6));
    scheduler.start()?;
    run_ticks(&mut scheduler, 3)?;
    scheduler.play()?;
    scheduler.tick()?;
    assert_eq!(scheduler.state().playback_cursor(), 1);

    scheduler.start()?;

    assert_eq!(scheduler.mode(), Mode::Recording);
    assert!(scheduler.state().archive().is_empty());
    assert!(scheduler.state().previous_frame().is_none());
    assert_eq!(scheduler.state().playback_cursor(), 0);
    assert_eq!(scheduler.source().acquisitions, 1);

    // First frame of the new recording has nothing to compare against.
    let outcome = scheduler.tick()?;
    assert_eq!(outcome.analysis().map(|a| a.analyzed), Some(false));
    Ok(())
}

#[test]
fn test_acquisition_failure_is_fatal() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::denied());

    let err = scheduler.start().unwrap_err();

    assert!(matches!(err, SessionError::Source(SourceError::AccessDenied)));
    assert_eq!(scheduler.mode(), Mode::Idle);
    assert_eq!(scheduler.tick()?, TickOutcome::Idle);
    assert_eq!(scheduler.processor().resets, 0);
    Ok(())
}

#[test]
fn test_stale_frames_are_discarded() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(2));
    scheduler.start()?;
    scheduler.tick()?;

    let ticket = scheduler.ticket();
    scheduler.stop();
    assert_eq!(scheduler.submit(ticket, frame(9))?, TickOutcome::Stale);

    // Restarting bumps the epoch even though the mode is the same.
    scheduler.start()?;
    let old = scheduler.ticket();
    scheduler.start()?;
    assert_eq!(old.mode, scheduler.ticket().mode);
    assert_eq!(scheduler.submit(old, frame(10))?, TickOutcome::Stale);

    assert!(scheduler.state().archive().is_empty());
    assert!(scheduler.state().previous_frame().is_none());
    assert_eq!(scheduler.processor().seen, vec![0]);
    assert_eq!(scheduler.stats().stale, 2);
    Ok(())
}

#[test]
fn test_stop_cancels_playback() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(3));
    scheduler.start()?;
    run_ticks(&mut scheduler, 3)?;
    scheduler.play()?;
    scheduler.tick()?;

    assert!(scheduler.stop());
    assert_eq!(scheduler.mode(), Mode::Idle);
    assert_eq!(scheduler.state().playback_cursor(), 0);
    assert_eq!(scheduler.tick()?, TickOutcome::Idle);

    // Playing again starts over from the first archived frame.
    scheduler.play()?;
    let outcome = scheduler.tick()?;
    assert_eq!(outcome.analysis().map(|a| a.sequence), Some(0));
    Ok(())
}

#[test]
fn test_malformed_archived_frame_is_skipped_in_playback() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::new(Vec::new()));
    let loaded = scheduler.load_archive(vec![
        frame(0),
        Frame::from_rgba(0, 0, Vec::new(), 1),
        frame(2),
    ])?;
    assert_eq!(loaded, 3);

    scheduler.play()?;
    let outcomes = run_until_idle(&mut scheduler)?;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        outcomes[1],
        TickOutcome::Skipped(SkipReason::InvalidFrame(_))
    ));
    assert_eq!(outcomes[2].analysis().map(|a| a.analyzed), Some(true));
    assert_eq!(scheduler.processor().seen, vec![0, 2]);
    assert_eq!(scheduler.source().acquisitions, 0);
    Ok(())
}

#[test]
fn test_archive_is_locked_while_recording() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(1));
    scheduler.start()?;
    assert!(matches!(
        scheduler.load_archive(vec![frame(0)]),
        Err(SessionError::ArchiveLocked(Mode::Recording))
    ));
    Ok(())
}

#[test]
fn test_driver_ticks_at_fixed_cadence() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(5));
    let mut driver = TickDriver::new(ManualClock::new(), Duration::from_millis(100));

    scheduler.start()?;
    let mut observed = Vec::new();
    let recorded = driver.run(&mut scheduler, Some(5), |s, _| {
        observed.push(s.state().archive().len());
        Ok(())
    })?;

    assert_eq!(recorded, 5);
    assert_eq!(observed, vec![1, 2, 3, 4, 5]);
    assert!(driver.clock().sleeps().iter().all(|d| *d == Duration::from_millis(100)));
    assert_eq!(driver.clock().elapsed_total(), Duration::from_millis(500));

    scheduler.play()?;
    let replayed = driver.run(&mut scheduler, None, |_, _| Ok(()))?;

    // No sleep after the tick that completes playback.
    assert_eq!(replayed, 5);
    assert_eq!(driver.clock().sleeps().len(), 9);
    assert_eq!(scheduler.mode(), Mode::Idle);
    Ok(())
}

#[test]
fn test_driver_does_nothing_while_idle() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(3));
    let mut driver = TickDriver::new(ManualClock::new(), Duration::from_millis(100));

    let ticks = driver.run(&mut scheduler, Some(10), |_, _| Ok(()))?;

    assert_eq!(ticks, 0);
    assert!(driver.clock().sleeps().is_empty());
    Ok(())
}

#[test]
fn test_replay_from_exported_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for seq in 0..3 {
        ImageUtils::save_frame(&frame(seq), dir.path().join(format!("{:05}.png", seq)))?;
    }
    std::fs::write(dir.path().join("00001-broken.png"), b"truncated")?;

    let frames = ImageUtils::load_frames_from_dir(dir.path())?;
    assert_eq!(frames.len(), 4);

    let mut scheduler = scheduler(ScriptedSource::new(Vec::new()));
    scheduler.load_archive(frames)?;
    scheduler.play()?;
    let outcomes = run_until_idle(&mut scheduler)?;

    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Skipped(_)))
        .count();
    assert_eq!((outcomes.len(), skipped), (4, 1));
    assert_eq!(scheduler.stats().analyzed, 2);
    Ok(())
}

#[test]
fn test_failed_processing_is_not_archived() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::new(vec![
        Ok(Some(frame(0))),
        Ok(Some(Frame::filled(4, 4, [1, 0, 0, 255], 1))),
        Ok(Some(Frame::filled(4, 4, [2, 0, 0, 255], 2))),
    ]));
    let mut driver = TickDriver::new(ManualClock::new(), Duration::from_millis(100));

    scheduler.start()?;
    let mut outcomes = Vec::new();
    let ticks = driver.run(&mut scheduler, Some(3), |_, outcome| {
        outcomes.push(outcome.clone());
        Ok(())
    })?;

    assert_eq!(ticks, 3);
    assert!(matches!(
        outcomes[1],
        TickOutcome::Skipped(SkipReason::ProcessingFailed(ref msg)) if msg.contains("differ")
    ));
    // Frame 1 still became the previous frame, so frame 2 compared against it.
    assert_eq!(outcomes[2].analysis().map(|a| a.analyzed), Some(true));
    assert_eq!(scheduler.mode(), Mode::Recording);

    let sequences: Vec<u64> = scheduler.state().archive().iter().map(|f| f.sequence()).collect();
    assert_eq!(sequences, vec![0, 2]);
    let stats = scheduler.stats();
    assert_eq!((stats.captured, stats.skipped), (2, 1));
    Ok(())
}

#[test]
fn test_last_playback_tick_keeps_its_overlay() -> Result<()> {
    let mut scheduler = scheduler(ScriptedSource::frames(3));
    let mut driver = TickDriver::new(ManualClock::new(), Duration::from_millis(100));
    scheduler.start()?;
    run_ticks(&mut scheduler, 3)?;
    scheduler.play()?;
    let resets_before = scheduler.processor().resets;

    let mut drawn = Vec::new();
    driver.run(&mut scheduler, None, |s, outcome| {
        if let Some(analysis) = outcome.analysis() {
            let overlay = Overlay::from_analysis(analysis);
            drawn.push((analysis.sequence, overlay.commands().to_vec(), s.mode()));
        }
        Ok(())
    })?;

    assert_eq!(drawn.len(), 3);
    assert!(drawn[0].1.is_empty());
    let (sequence, commands, mode) = &drawn[2];
    assert_eq!(*sequence, 2);
    assert_eq!(*mode, Mode::Idle);
    assert_eq!(commands, &vec![DrawCommand::Rect(BBox::new(0, 0, 8, 8))]);
    // The live view was already restored when the final outcome arrived.
    assert_eq!(scheduler.processor().resets, resets_before + 1);
    Ok(())
}
