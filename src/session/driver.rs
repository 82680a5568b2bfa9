//! Fixed-cadence tick driver

use super::scheduler::{SessionScheduler, TickOutcome};
use ballwatch_core::{FrameSource, Mode};
use ballwatch_cv::Result;
use ballwatch_cv::traits::FrameProcessor;
use std::time::{Duration, Instant};

/// Time source for the driver.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

/// Wall clock; sleeping blocks the thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on. Deterministic cadence for tests.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Instant,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Instant::now(),
            sleeps: Vec::new(),
        }
    }

    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    pub fn elapsed_total(&self) -> Duration {
        self.sleeps.iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += duration;
        self.sleeps.push(duration);
    }
}

/// Calls [`SessionScheduler::tick`] once per period until the session goes
/// idle. Ticks never overlap: the next one starts only after the previous
/// returned and the remainder of the period has been slept.
pub struct TickDriver<C> {
    clock: C,
    period: Duration,
}

impl<C: Clock> TickDriver<C> {
    pub fn new(clock: C, period: Duration) -> Self {
        Self { clock, period }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Tick until the session is idle or `max_ticks` ticks ran. `on_tick`
    /// sees the scheduler right after each tick. Returns the number of ticks.
    pub fn run<S, P, F>(
        &mut self,
        scheduler: &mut SessionScheduler<S, P>,
        max_ticks: Option<usize>,
        mut on_tick: F,
    ) -> Result<usize>
    where
        S: FrameSource,
        P: FrameProcessor,
        F: FnMut(&SessionScheduler<S, P>, &TickOutcome) -> Result<()>,
    {
        let mut ticks = 0;

        while scheduler.mode() != Mode::Idle && max_ticks.is_none_or(|max| ticks < max) {
            let cycle_start = self.clock.now();

            let outcome = scheduler.tick()?;
            ticks += 1;
            on_tick(scheduler, &outcome)?;

            let elapsed = self.clock.now().saturating_duration_since(cycle_start);
            if elapsed < self.period && scheduler.mode() != Mode::Idle {
                self.clock.sleep(self.period - elapsed);
            }
        }

        Ok(ticks)
    }
}
