//! Playback sessions on the offline backend with a paused clock

use std::time::Duration;
use tibrah_audio::{ContextState, OfflineBackend, Waveform};
use tibrah_cli::commands::audio::{engine_with, play_rife, play_tone};
use tibrah_cli::{CliError, PlaybackArgs, TibrahConfig};
use tokio::time::sleep;

fn setup(args: &PlaybackArgs) -> (tibrah_audio::AudioEngine, OfflineBackend) {
    let backend = OfflineBackend::new(48_000, 2);
    let engine = engine_with(backend.clone(), &TibrahConfig::default(), args).unwrap();
    (engine, backend)
}

fn never() -> std::future::Pending<()> {
    std::future::pending()
}

#[tokio::test(start_paused = true)]
async fn tone_plays_for_duration_then_closes() {
    let (engine, backend) = setup(&PlaybackArgs::default());

    let summary = play_tone(&engine, 528.0, Some(Duration::from_secs(2)), never())
        .await
        .unwrap();

    assert_eq!(summary.frequencies_played, 1);
    assert!(summary.elapsed >= Duration::from_secs(2));
    assert!(!engine.is_playing());
    let ctx = backend.context().unwrap();
    assert_eq!(ctx.state(), ContextState::Closed);
}

#[tokio::test(start_paused = true)]
async fn rife_advances_with_configured_step() {
    let (engine, _backend) = setup(&PlaybackArgs::default());

    // Default step is 5 s: 0, 5 and 10 s
    let summary = play_rife(
        &engine,
        vec![100.0, 200.0, 300.0],
        None,
        false,
        Some(Duration::from_secs(12)),
        never(),
    )
    .await
    .unwrap();

    assert_eq!(summary.frequencies_played, 3);
}

#[tokio::test(start_paused = true)]
async fn rife_step_override_is_clamped() {
    let (engine, _backend) = setup(&PlaybackArgs::default());

    // 1 s is raised to the 60 s minimum: 0, 60 and 120 s
    let summary = play_rife(
        &engine,
        vec![100.0, 200.0],
        Some(1),
        false,
        Some(Duration::from_secs(130)),
        never(),
    )
    .await
    .unwrap();

    assert_eq!(summary.frequencies_played, 3);
}

#[tokio::test(start_paused = true)]
async fn manual_rife_holds_first_frequency() {
    let (engine, _backend) = setup(&PlaybackArgs::default());

    let summary = play_rife(
        &engine,
        vec![100.0, 200.0, 300.0],
        None,
        true,
        Some(Duration::from_secs(30)),
        never(),
    )
    .await
    .unwrap();

    assert_eq!(summary.frequencies_played, 1);
}

#[tokio::test(start_paused = true)]
async fn interrupt_ends_an_open_session() {
    let (engine, _backend) = setup(&PlaybackArgs::default());

    let summary = play_tone(&engine, 432.0, None, sleep(Duration::from_secs(3)))
        .await
        .unwrap();

    assert!(summary.elapsed >= Duration::from_secs(3));
    assert!(!engine.is_playing());
}

#[tokio::test(start_paused = true)]
async fn invalid_frequency_is_an_error() {
    let (engine, backend) = setup(&PlaybackArgs::default());

    let result = play_tone(&engine, -5.0, Some(Duration::from_secs(1)), never()).await;

    assert!(matches!(result, Err(CliError::Audio(_))));
    assert!(!engine.is_playing());
    assert_eq!(backend.context().map(|ctx| ctx.connected_voices()).unwrap_or(0), 0);
}

#[tokio::test(start_paused = true)]
async fn overrides_apply_to_engine() {
    let args = PlaybackArgs {
        waveform: Some(Waveform::Sawtooth),
        volume: Some(1.7),
        ..PlaybackArgs::default()
    };
    let (engine, _backend) = setup(&args);

    assert_eq!(engine.waveform(), Waveform::Sawtooth);
    assert_eq!(engine.volume(), 1.0);
}
