//! Desktop audio output for the Tibrah oscillator engine
//!
//! Provides [`CpalBackend`], an [`AudioBackend`](tibrah_audio::AudioBackend)
//! that plays an engine's audio context through a CPAL output stream.
//!
//! # Example
//!
//! ```no_run
//! use tibrah_audio::{AudioEngine, EngineConfig};
//! use tibrah_audio_desktop::CpalBackend;
//! use tibrah_core::Track;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AudioEngine::new(CpalBackend::new(), EngineConfig::default())?;
//! engine.play_track(Track::tone("schumann", "Schumann", 7.83))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

mod error;
mod output;

pub use error::{DesktopAudioError, Result};
pub use output::{list_output_devices, CpalBackend};
