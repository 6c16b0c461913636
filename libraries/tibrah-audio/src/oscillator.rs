//! Periodic waveform generator
//!
//! Oscillators are one-shot, like Web Audio's `OscillatorNode`: once
//! stopped they cannot be started again. Frequency changes are modeled by
//! building a new oscillator.

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// Sample at `phase` in cycles, `[0, 1)`
    ///
    /// Every shape starts at zero and rises, so a fresh oscillator never
    /// begins on a discontinuity (except square, which has no zero).
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * (phase + 0.5).fract() - 1.0,
            Waveform::Triangle => 4.0 * ((phase + 0.75).fract() - 0.5).abs() - 1.0,
        };
        value as f32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Waveform::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown waveform '{s}' (sine, square, sawtooth, triangle)"))
    }
}

/// Reject non-positive or non-finite frequencies
pub fn validate_frequency(hz: f32) -> Result<f32> {
    if hz.is_finite() && hz > 0.0 {
        Ok(hz)
    } else {
        Err(AudioError::InvalidFrequency(hz))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Started,
    Stopped,
}

/// Phase-accumulating oscillator
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    /// Position in the current cycle, `[0, 1)`
    phase: f64,
    lifecycle: Lifecycle,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32) -> Result<Self> {
        Ok(Self {
            waveform,
            frequency: validate_frequency(frequency)?,
            phase: 0.0,
            lifecycle: Lifecycle::Idle,
        })
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Start producing samples. Fails if already started or stopped.
    pub fn start(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Idle => {
                self.lifecycle = Lifecycle::Started;
                Ok(())
            }
            Lifecycle::Started => Err(AudioError::invalid_state("oscillator already started")),
            Lifecycle::Stopped => Err(AudioError::invalid_state("oscillator already stopped")),
        }
    }

    /// Stop for good. Fails if never started or already stopped.
    pub fn stop(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Started => {
                self.lifecycle = Lifecycle::Stopped;
                Ok(())
            }
            Lifecycle::Idle => Err(AudioError::invalid_state("oscillator was never started")),
            Lifecycle::Stopped => Err(AudioError::invalid_state("oscillator already stopped")),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.lifecycle == Lifecycle::Started
    }

    /// Next sample at `sample_rate`; silence unless started
    #[inline]
    pub fn next_sample(&mut self, sample_rate: u32) -> f32 {
        if self.lifecycle != Lifecycle::Started {
            return 0.0;
        }
        let sample = self.waveform.sample(self.phase);
        self.phase = (self.phase + f64::from(self.frequency) / f64::from(sample_rate)).fract();
        sample
    }
}
