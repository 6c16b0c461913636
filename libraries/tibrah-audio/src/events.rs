//! Engine events and status snapshots

use crate::oscillator::Waveform;
use crate::sequence::StepProgress;
use serde::Serialize;
use tibrah_core::Track;

/// Events published by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A new track became the active track
    TrackChanged(Track),

    /// Playing flag flipped
    StateChanged { playing: bool },

    /// A voice was scheduled at a new frequency
    FrequencyChanged { index: Option<usize>, hz: f32 },

    /// Volume applied
    VolumeChanged(f32),

    /// Player closed; no active track
    Stopped,
}

/// Point-in-time view of the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub track: Option<Track>,
    pub playing: bool,
    pub volume: f32,
    pub waveform: Waveform,
    pub sequence: Option<StepProgress>,
}
