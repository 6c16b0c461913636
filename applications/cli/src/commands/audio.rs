//! Tone and Rife playback

use crate::cli::PlaybackArgs;
use crate::config::TibrahConfig;
use crate::error::{CliError, Result};
use std::future::Future;
use std::time::Duration;
use tibrah_audio::{AudioBackend, AudioEngine, EngineEvent, PlayOutcome};
use tibrah_audio_desktop::CpalBackend;
use tibrah_core::Track;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{info, warn};

/// What a playback session did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    /// Voices started, one per frequency change
    pub frequencies_played: usize,
    pub elapsed: Duration,
}

/// Build an engine on the configured (or overridden) output device
pub fn desktop_engine(config: &TibrahConfig, args: &PlaybackArgs) -> Result<AudioEngine> {
    let backend = match args.device.as_ref().or(config.audio.device.as_ref()) {
        Some(name) => CpalBackend::with_device(name.clone()),
        None => CpalBackend::new(),
    };
    engine_with(backend, config, args)
}

/// Build an engine on `backend`, applying command-line overrides
pub fn engine_with(
    backend: impl AudioBackend,
    config: &TibrahConfig,
    args: &PlaybackArgs,
) -> Result<AudioEngine> {
    let mut engine_config = config.engine_config();
    if let Some(waveform) = args.waveform {
        engine_config.waveform = waveform;
    }

    let engine = AudioEngine::new(backend, engine_config)?;
    if let Some(volume) = args.volume {
        let applied = engine.set_volume(volume);
        if applied != volume {
            warn!(requested = volume, applied, "Volume clamped");
        }
    }
    Ok(engine)
}

pub fn tone_track(hz: f32) -> Track {
    Track::tone(format!("tone-{hz}"), format!("{hz} Hz"), hz)
}

pub fn rife_track(frequencies: Vec<f32>) -> Track {
    let id = frequencies
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join("-");
    let title = format!("Rife sequence ({} frequencies)", frequencies.len());
    Track::rife(format!("rife-{id}"), title, frequencies)
}

/// Play a Rife track with optional step and auto-advance overrides
pub async fn play_rife<F>(
    engine: &AudioEngine,
    frequencies: Vec<f32>,
    step: Option<u64>,
    manual: bool,
    duration: Option<Duration>,
    interrupt: F,
) -> Result<SessionSummary>
where
    F: Future<Output = ()>,
{
    if let Some(step) = step {
        let applied = engine.set_step_duration(Duration::from_secs(step));
        info!(step = ?applied, "Step duration set");
    }

    let track = rife_track(frequencies);
    play_session(engine, track, duration, interrupt, |engine| {
        if manual {
            engine.set_auto_advance(false)?;
        }
        Ok(())
    })
    .await
}

/// Play a single tone
pub async fn play_tone<F>(
    engine: &AudioEngine,
    hz: f32,
    duration: Option<Duration>,
    interrupt: F,
) -> Result<SessionSummary>
where
    F: Future<Output = ()>,
{
    play_session(engine, tone_track(hz), duration, interrupt, |_| Ok(())).await
}

/// Start `track`, report frequency changes until `duration` elapses or
/// `interrupt` resolves, then fade out and close the engine
async fn play_session<F, S>(
    engine: &AudioEngine,
    track: Track,
    duration: Option<Duration>,
    interrupt: F,
    on_started: S,
) -> Result<SessionSummary>
where
    F: Future<Output = ()>,
    S: FnOnce(&AudioEngine) -> tibrah_audio::Result<()>,
{
    let mut events = engine.subscribe();
    let started = Instant::now();

    info!(track = %track.title, "Playing");
    match engine.play_track(track)? {
        PlayOutcome::Started => {}
        outcome => {
            return Err(CliError::InvalidArgument(format!(
                "track did not start ({outcome:?})"
            )))
        }
    }
    on_started(engine)?;

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(interrupt);

    let mut summary = SessionSummary::default();
    loop {
        tokio::select! {
            () = &mut deadline => break,
            () = &mut interrupt => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(EngineEvent::FrequencyChanged { index, hz }) => {
                    summary.frequencies_played += 1;
                    match index {
                        Some(index) => println!("[{}] {hz} Hz", index + 1),
                        None => println!("{hz} Hz"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed engine events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Fade out and let the teardown finish before the context closes
    if engine.is_playing() {
        engine.toggle_play()?;
        tokio::time::sleep(engine.config().teardown_delay).await;
    }
    engine.shutdown();

    summary.elapsed = started.elapsed();
    Ok(summary)
}

pub fn print_devices() -> Result<()> {
    let devices = tibrah_audio_desktop::list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for name in devices {
        println!("{name}");
    }
    Ok(())
}
