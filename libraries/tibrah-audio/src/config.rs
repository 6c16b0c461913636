//! Engine timing and defaults

use crate::error::{AudioError, Result};
use crate::oscillator::Waveform;
use std::time::Duration;

/// Default hold time per frequency when a Rife track starts
pub const DEFAULT_STEP_DURATION: Duration = Duration::from_secs(5);

/// Bounds for a step duration chosen in the sequence player
pub const MIN_STEP_DURATION: Duration = Duration::from_secs(60);
pub const MAX_STEP_DURATION: Duration = Duration::from_secs(600);

/// Exponential fades stop here; a ramp cannot target zero
pub const SILENCE_FLOOR: f32 = 0.001;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Linear ramp from silence when a voice starts (default: 100ms)
    pub fade_in: Duration,

    /// Exponential ramp to [`SILENCE_FLOOR`] on stop (default: 100ms)
    pub fade_out: Duration,

    /// Wait after a fade-out before the voice is stopped and released
    /// (default: 150ms, must cover `fade_out`)
    pub teardown_delay: Duration,

    /// Wait before a new voice is built (default: 50ms)
    pub start_delay: Duration,

    /// Initial volume, `[0, 1]` (default: 0.5)
    pub volume: f32,

    /// Initial waveform (default: sine)
    pub waveform: Waveform,

    /// Hold time per Rife frequency (default: 5s)
    pub step_duration: Duration,

    /// Event channel capacity (default: 64)
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_in: Duration::from_millis(100),
            fade_out: Duration::from_millis(100),
            teardown_delay: Duration::from_millis(150),
            start_delay: Duration::from_millis(50),
            volume: 0.5,
            waveform: Waveform::Sine,
            step_duration: DEFAULT_STEP_DURATION,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.teardown_delay < self.fade_out {
            return Err(AudioError::invalid_state(format!(
                "teardown delay {:?} is shorter than fade-out {:?}",
                self.teardown_delay, self.fade_out
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(AudioError::invalid_state(format!(
                "volume {} outside [0, 1]",
                self.volume
            )));
        }
        if self.step_duration.is_zero() {
            return Err(AudioError::invalid_state("step duration must be non-zero"));
        }
        if self.event_capacity == 0 {
            return Err(AudioError::invalid_state("event capacity must be non-zero"));
        }
        Ok(())
    }
}

/// Clamp a user-chosen step duration to the sequence player's range
pub fn clamp_step_duration(duration: Duration) -> Duration {
    duration.clamp(MIN_STEP_DURATION, MAX_STEP_DURATION)
}
