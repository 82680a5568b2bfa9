//! Generated frames of a bouncing ball, for demos and tests without a camera.

use ballwatch_core::{FacingMode, Frame, FrameSource, SourceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BACKGROUND: u8 = 30;
const BALL: u8 = 230;

/// Bright ball moving at constant velocity over a dark, optionally noisy
/// background, bouncing off the frame edges.
pub struct SyntheticBallSource {
    width: u32,
    height: u32,
    radius: f32,
    position: (f32, f32),
    velocity: (f32, f32),
    noise: u8,
    rng: StdRng,
    limit: Option<u64>,
    next_sequence: u64,
    acquired: bool,
}

impl SyntheticBallSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            radius: 18.0,
            position: (width as f32 / 4.0, height as f32 / 2.0),
            velocity: (12.0, 7.0),
            noise: 0,
            rng: StdRng::seed_from_u64(0),
            limit: None,
            next_sequence: 0,
            acquired: false,
        }
    }

    pub fn with_ball(mut self, radius: f32, position: (f32, f32), velocity: (f32, f32)) -> Self {
        self.radius = radius;
        self.position = position;
        self.velocity = velocity;
        self
    }

    /// Add uniform background noise of up to `amplitude` intensity levels.
    pub fn with_noise(mut self, amplitude: u8, seed: u64) -> Self {
        self.noise = amplitude;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Stop producing frames after `frames` samples.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// Ball center in the next frame.
    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    fn render(&mut self) -> Frame {
        let (cx, cy) = self.position;
        let r2 = self.radius * self.radius;
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 4);

        for y in 0..self.height {
            for x in 0..self.width {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                let value = if dx * dx + dy * dy <= r2 {
                    BALL
                } else if self.noise > 0 {
                    BACKGROUND.saturating_add(self.rng.gen_range(0..=self.noise))
                } else {
                    BACKGROUND
                };
                pixels.extend_from_slice(&[value, value, value, 255]);
            }
        }

        Frame::from_rgba(self.width, self.height, pixels, self.next_sequence)
    }

    fn advance(&mut self) {
        let (mut x, mut y) = (
            self.position.0 + self.velocity.0,
            self.position.1 + self.velocity.1,
        );
        if x - self.radius < 0.0 || x + self.radius > self.width as f32 {
            self.velocity.0 = -self.velocity.0;
            x = self.position.0 + self.velocity.0;
        }
        if y - self.radius < 0.0 || y + self.radius > self.height as f32 {
            self.velocity.1 = -self.velocity.1;
            y = self.position.1 + self.velocity.1;
        }
        self.position = (x, y);
    }
}

impl FrameSource for SyntheticBallSource {
    fn acquire(&mut self, facing: FacingMode) -> Result<(), SourceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SourceError::DeviceUnavailable(facing));
        }
        self.acquired = true;
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }

    fn sample(&mut self) -> anyhow::Result<Option<Frame>> {
        if !self.acquired || self.limit.is_some_and(|limit| self.next_sequence >= limit) {
            return Ok(None);
        }

        let frame = self.render();
        self.next_sequence += 1;
        self.advance();
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.acquired = false;
    }
}
