//! Session state machine: Idle, Recording and Playing over one frame archive.

use crate::frame::Frame;
use crate::source::SourceError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    Recording,
    Playing,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Recording => "recording",
            Mode::Playing => "playing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("playback unavailable: the archive is empty")]
    PlaybackUnavailable,

    #[error("archive cannot change while {0}")]
    ArchiveLocked(Mode),

    #[error("could not start capture")]
    Source(#[from] SourceError),
}

/// Snapshot of the session identity taken when a tick starts. Work that
/// finishes after the session changed mode carries a stale ticket and must
/// be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub epoch: u64,
    pub mode: Mode,
}

/// The one piece of mutable state a running session owns.
#[derive(Debug, Default)]
pub struct SessionState {
    mode: Mode,
    previous_frame: Option<Frame>,
    archive: Vec<Frame>,
    playback_cursor: usize,
    epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn previous_frame(&self) -> Option<&Frame> {
        self.previous_frame.as_ref()
    }

    /// Store the frame the next tick compares against, returning the old one.
    pub fn replace_previous(&mut self, frame: Frame) -> Option<Frame> {
        self.previous_frame.replace(frame)
    }

    pub fn archive(&self) -> &[Frame] {
        &self.archive
    }

    pub fn playback_cursor(&self) -> usize {
        self.playback_cursor
    }

    pub fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            mode: self.mode,
        }
    }

    /// Whether work started under `ticket` may still touch this state.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch && ticket.mode == self.mode
    }

    /// A recorded archive exists and is not being written to.
    pub fn playback_available(&self) -> bool {
        self.mode != Mode::Recording && !self.archive.is_empty()
    }

    /// Enter Recording from any mode. Playback in progress is cancelled, and
    /// the archive and previous frame are cleared unconditionally.
    pub fn begin_recording(&mut self) {
        if self.mode == Mode::Playing {
            self.finish_playback();
        }
        self.archive.clear();
        self.previous_frame = None;
        self.enter(Mode::Recording);
    }

    /// Leave Recording (or cancel Playing). Returns whether playback is now
    /// available.
    pub fn stop(&mut self) -> bool {
        match self.mode {
            Mode::Recording => self.enter(Mode::Idle),
            Mode::Playing => self.finish_playback(),
            Mode::Idle => {}
        }
        self.playback_available()
    }

    /// Enter Playing from the start of the archive. Recording in progress is
    /// stopped first; a playback in progress restarts.
    pub fn begin_playback(&mut self) -> Result<(), SessionError> {
        if self.mode == Mode::Recording {
            self.stop();
        }
        if self.archive.is_empty() {
            return Err(SessionError::PlaybackUnavailable);
        }
        self.previous_frame = None;
        self.playback_cursor = 0;
        self.enter(Mode::Playing);
        Ok(())
    }

    /// End playback: cursor back to zero, mode back to Idle.
    pub fn finish_playback(&mut self) {
        self.playback_cursor = 0;
        self.enter(Mode::Idle);
    }

    /// Append a captured frame. Only legal while recording.
    pub fn append(&mut self, frame: Frame) -> Result<(), SessionError> {
        if self.mode != Mode::Recording {
            return Err(SessionError::ArchiveLocked(self.mode));
        }
        self.archive.push(frame);
        Ok(())
    }

    /// Replace the archive with externally sourced frames. Only legal while
    /// Idle; frames keep their order.
    pub fn load_archive<I>(&mut self, frames: I) -> Result<usize, SessionError>
    where
        I: IntoIterator<Item = Frame>,
    {
        if self.mode != Mode::Idle {
            return Err(SessionError::ArchiveLocked(self.mode));
        }
        self.archive = frames.into_iter().collect();
        self.playback_cursor = 0;
        Ok(self.archive.len())
    }

    /// Next archived frame in playback order, advancing the cursor.
    pub fn next_playback_frame(&mut self) -> Option<Frame> {
        if self.mode != Mode::Playing {
            return None;
        }
        let frame = self.archive.get(self.playback_cursor)?.clone();
        self.playback_cursor += 1;
        Some(frame)
    }

    /// The cursor has reached the end of the archive.
    pub fn playback_exhausted(&self) -> bool {
        self.playback_cursor >= self.archive.len()
    }

    fn enter(&mut self, mode: Mode) {
        debug!("session {} -> {} (epoch {})", self.mode, mode, self.epoch + 1);
        self.mode = mode;
        self.epoch = self.epoch.wrapping_add(1);
    }
}
