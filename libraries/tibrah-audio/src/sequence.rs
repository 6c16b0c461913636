//! Rife frequency sequences
//!
//! A sequence is an ordered list of frequencies, each held for a fixed step
//! duration and looping forever. This type only tracks position and timing;
//! the engine decides when to advance and what to play.

use crate::error::{AudioError, Result};
use crate::oscillator::validate_frequency;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Where playback is inside the current step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepProgress {
    pub index: usize,
    pub len: usize,
    pub frequency: f32,
    pub elapsed: Duration,
    pub total: Duration,
    pub auto_advance: bool,
}

impl StepProgress {
    /// Fraction of the current step completed, `[0, 1]`
    pub fn fraction(&self) -> f32 {
        if self.total.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.total.as_secs_f32()).min(1.0)
    }
}

/// Position and timing of a looping frequency sequence
#[derive(Debug, Clone)]
pub struct RifeSequence {
    frequencies: Vec<f32>,
    index: usize,
    step_duration: Duration,
    auto_advance: bool,
    step_started: Instant,
    /// Set while playback is stopped; freezes `elapsed`
    frozen_at: Option<Instant>,
}

impl RifeSequence {
    pub fn new(frequencies: Vec<f32>, step_duration: Duration, now: Instant) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(AudioError::EmptySequence);
        }
        for &hz in &frequencies {
            validate_frequency(hz)?;
        }

        Ok(Self {
            frequencies,
            index: 0,
            step_duration,
            auto_advance: true,
            step_started: now,
            frozen_at: None,
        })
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_frequency(&self) -> f32 {
        self.frequencies[self.index]
    }

    pub fn step_duration(&self) -> Duration {
        self.step_duration
    }

    pub fn set_step_duration(&mut self, step_duration: Duration) {
        self.step_duration = step_duration;
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    /// Timer-driven step: move forward, wrapping to the start
    pub fn advance(&mut self, now: Instant) -> f32 {
        self.index = (self.index + 1) % self.frequencies.len();
        self.restart_step(now);
        self.current_frequency()
    }

    /// Manual step forward (same wrap as [`advance`](Self::advance))
    pub fn next(&mut self, now: Instant) -> f32 {
        self.advance(now)
    }

    /// Manual step back, wrapping to the end
    pub fn previous(&mut self, now: Instant) -> f32 {
        let len = self.frequencies.len();
        self.index = (self.index + len - 1) % len;
        self.restart_step(now);
        self.current_frequency()
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) -> Result<f32> {
        if index >= self.frequencies.len() {
            return Err(AudioError::InvalidSequenceIndex {
                index,
                len: self.frequencies.len(),
            });
        }
        self.index = index;
        self.restart_step(now);
        Ok(self.current_frequency())
    }

    /// Reset the step clock without moving
    pub fn restart_step(&mut self, now: Instant) {
        self.step_started = now;
        self.frozen_at = None;
    }

    /// Stop the step clock (playback stopped)
    pub fn freeze(&mut self, now: Instant) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(now);
        }
    }

    pub fn progress(&self, now: Instant) -> StepProgress {
        let until = self.frozen_at.unwrap_or(now);
        StepProgress {
            index: self.index,
            len: self.frequencies.len(),
            frequency: self.current_frequency(),
            elapsed: until
                .saturating_duration_since(self.step_started)
                .min(self.step_duration),
            total: self.step_duration,
            auto_advance: self.auto_advance,
        }
    }
}
