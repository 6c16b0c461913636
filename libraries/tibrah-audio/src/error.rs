//! Error types for the oscillator engine

use thiserror::Error;

/// Audio engine errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// Node used in a state that does not allow the operation
    /// (start twice, stop before start, disconnect twice)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Exponential ramps cannot reach or cross zero
    #[error("Invalid exponential ramp target: {0} (must be > 0)")]
    InvalidRampTarget(f32),

    /// Automation time is negative or not finite
    #[error("Invalid automation time: {0}")]
    InvalidTime(f64),

    /// The audio context was closed
    #[error("Audio context is closed")]
    ContextClosed,

    /// Frequency is not a positive finite number
    #[error("Invalid frequency: {0} Hz")]
    InvalidFrequency(f32),

    /// Sequence index out of range
    #[error("Sequence index {index} out of range (len {len})")]
    InvalidSequenceIndex { index: usize, len: usize },

    /// Rife sequence with no frequencies
    #[error("Frequency sequence is empty")]
    EmptySequence,

    /// Sequence control used while no sequence is loaded
    #[error("No frequency sequence is loaded")]
    NoSequence,

    /// Voice id unknown to the context
    #[error("Unknown voice: {0}")]
    UnknownVoice(u64),

    /// Engine created outside a tokio runtime
    #[error("No tokio runtime available")]
    NoRuntime,

    /// Platform backend failure (device, stream)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl AudioError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;
