//! Tibrah Audio - Oscillator Engine
//!
//! Platform-agnostic synthesis of therapeutic frequencies.
//!
//! This crate provides:
//! - A Web Audio style graph ([`AudioContext`]): oscillator → gain → output
//! - Gain automation ([`AudioParam`]): set, linear and exponential ramps, cancel
//! - Single-tone playback with click-free fade-in and fade-out
//! - Rife sequences: looping frequency lists with timed auto-advance
//! - Volume and waveform control
//!
//! # Architecture
//!
//! `tibrah-audio` has no dependency on an audio device. Output is supplied
//! through the [`AudioBackend`] trait: `tibrah-audio-desktop` drives a
//! context from a CPAL stream, [`OfflineBackend`] renders only when asked.
//!
//! The engine holds at most one live voice. Every frequency change tears
//! the old voice down (fade, then release) before a new one is built.
//!
//! # Example
//!
//! ```rust
//! use tibrah_audio::{AudioEngine, EngineConfig, OfflineBackend, PlayOutcome};
//! use tibrah_core::Track;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tibrah_audio::Result<()> {
//! let engine = AudioEngine::new(OfflineBackend::default(), EngineConfig::default())?;
//!
//! let track = Track::tone("solfeggio-528", "528 Hz", 528.0);
//! assert_eq!(engine.play_track(track.clone())?, PlayOutcome::Started);
//! engine.set_volume(0.8);
//!
//! // Same track again stops it
//! assert_eq!(engine.play_track(track)?, PlayOutcome::Stopped);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod oscillator;
pub mod param;
pub mod sequence;

pub use config::{
    clamp_step_duration, EngineConfig, DEFAULT_STEP_DURATION, MAX_STEP_DURATION,
    MIN_STEP_DURATION, SILENCE_FLOOR,
};
pub use context::{AudioBackend, AudioContext, ContextState, GraphStats, OfflineBackend, VoiceId};
pub use engine::{AudioEngine, PlayOutcome};
pub use error::{AudioError, Result};
pub use events::{EngineEvent, EngineStatus};
pub use oscillator::{validate_frequency, Oscillator, Waveform};
pub use param::AudioParam;
pub use sequence::{RifeSequence, StepProgress};
