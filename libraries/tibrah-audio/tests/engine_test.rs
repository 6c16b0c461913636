//! Engine integration tests
//!
//! Drive the engine on a paused tokio clock with the offline backend. The
//! audio context clock only moves when frames are rendered, so gain
//! envelopes are checked by rendering explicit spans of audio.

use std::time::Duration;
use tibrah_audio::{
    AudioContext, AudioEngine, AudioError, ContextState, EngineConfig, EngineEvent,
    OfflineBackend, PlayOutcome, Waveform, SILENCE_FLOOR,
};
use tibrah_core::Track;
use tokio::time::sleep;

const SAMPLE_RATE: u32 = 48_000;

fn engine() -> (AudioEngine, OfflineBackend) {
    let backend = OfflineBackend::new(SAMPLE_RATE, 2);
    let engine = AudioEngine::new(backend.clone(), EngineConfig::default()).unwrap();
    (engine, backend)
}

fn context(backend: &OfflineBackend) -> AudioContext {
    backend.context().expect("context opened")
}

fn render_ms(ctx: &AudioContext, ms: u32) {
    ctx.render_frames((SAMPLE_RATE / 1000 * ms) as usize);
}

fn live_frequency(ctx: &AudioContext) -> Option<f32> {
    let ids = ctx.connected_voice_ids();
    assert!(ids.len() <= 1, "more than one voice connected: {ids:?}");
    ids.first().and_then(|id| ctx.voice_frequency(*id))
}

fn rife() -> Track {
    Track::rife("rife-1", "Rife", vec![100.0, 200.0, 300.0])
}

// ============================================================================
// PLAY / STOP
// ============================================================================

#[tokio::test(start_paused = true)]
async fn tone_starts_after_delay() {
    let (engine, backend) = engine();

    let outcome = engine.play_track(Track::tone("t1", "528", 528.0)).unwrap();
    assert_eq!(outcome, PlayOutcome::Started);
    assert!(engine.is_playing());

    let ctx = context(&backend);
    assert_eq!(ctx.state(), ContextState::Running);
    assert_eq!(ctx.connected_voices(), 0, "voice is built after the start delay");

    sleep(Duration::from_millis(60)).await;
    assert_eq!(live_frequency(&ctx), Some(528.0));
}

#[tokio::test(start_paused = true)]
async fn same_track_twice_stops() {
    let (engine, backend) = engine();
    let track = Track::tone("t1", "528", 528.0);

    engine.play_track(track.clone()).unwrap();
    sleep(Duration::from_millis(60)).await;

    assert_eq!(engine.play_track(track.clone()).unwrap(), PlayOutcome::Stopped);
    assert!(!engine.is_playing());
    assert_eq!(engine.current_track(), Some(track));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(context(&backend).connected_voices(), 0);
}

#[tokio::test(start_paused = true)]
async fn toggle_pauses_and_replays() {
    let (engine, backend) = engine();
    assert_eq!(engine.toggle_play().unwrap(), PlayOutcome::Ignored);

    engine.play_track(Track::tone("t1", "432", 432.0)).unwrap();
    sleep(Duration::from_millis(60)).await;

    assert_eq!(engine.toggle_play().unwrap(), PlayOutcome::Stopped);
    assert!(!engine.is_playing());
    sleep(Duration::from_millis(200)).await;
    let ctx = context(&backend);
    assert_eq!(ctx.connected_voices(), 0);

    assert_eq!(engine.toggle_play().unwrap(), PlayOutcome::Started);
    sleep(Duration::from_millis(60)).await;
    assert_eq!(live_frequency(&ctx), Some(432.0));
    assert_eq!(backend.open_count(), 1, "context is reused");
}

#[tokio::test(start_paused = true)]
async fn close_player_is_immediate() {
    let (engine, backend) = engine();
    let mut events = engine.subscribe();

    engine.play_track(rife()).unwrap();
    sleep(Duration::from_millis(200)).await;
    let ctx = context(&backend);
    assert_eq!(ctx.connected_voices(), 1);

    engine.close_player();
    assert_eq!(ctx.connected_voices(), 0, "no fade on close");
    assert!(!engine.is_playing());
    assert!(engine.current_track().is_none());
    assert!(engine.sequence_progress().is_none());

    let mut saw_stopped = false;
    while let Ok(event) = events.try_recv() {
        saw_stopped |= event == EngineEvent::Stopped;
    }
    assert!(saw_stopped);

    // Nothing scheduled survives the close
    sleep(Duration::from_secs(30)).await;
    assert_eq!(ctx.connected_voices(), 0);
    assert!(engine.toggle_play().unwrap() == PlayOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn switching_tracks_replaces_voice() {
    let (engine, backend) = engine();

    engine.play_track(Track::tone("a", "A", 174.0)).unwrap();
    sleep(Duration::from_millis(60)).await;
    let ctx = context(&backend);
    assert_eq!(live_frequency(&ctx), Some(174.0));

    engine.play_track(Track::tone("b", "B", 285.0)).unwrap();
    assert!(engine.is_playing());
    // Old voice keeps fading until teardown
    sleep(Duration::from_millis(100)).await;
    assert_eq!(live_frequency(&ctx), Some(174.0));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(live_frequency(&ctx), Some(285.0));
    assert_eq!(ctx.stats().peak_connected, 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_start_never_builds_a_voice() {
    let (engine, backend) = engine();

    engine.play_track(Track::tone("a", "A", 111.0)).unwrap();
    sleep(Duration::from_millis(10)).await;
    engine.play_track(Track::tone("b", "B", 222.0)).unwrap();
    sleep(Duration::from_millis(10)).await;
    engine.play_track(Track::tone("c", "C", 333.0)).unwrap();

    sleep(Duration::from_millis(500)).await;
    let ctx = context(&backend);
    assert_eq!(live_frequency(&ctx), Some(333.0));
    assert_eq!(ctx.stats().voices_created, 1);
}

// ============================================================================
// UNSUPPORTED / INVALID TRACKS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn unsupported_tracks_are_ignored() {
    let (engine, backend) = engine();

    assert_eq!(
        engine.play_track(Track::music("m", "Music")).unwrap(),
        PlayOutcome::Ignored
    );
    assert_eq!(
        engine.play_track(Track::rife("r", "Empty", vec![])).unwrap(),
        PlayOutcome::Ignored
    );
    assert_eq!(backend.open_count(), 0, "nothing to play, no context");

    let tone = Track::tone("t", "Tone", 396.0);
    engine.play_track(tone.clone()).unwrap();
    sleep(Duration::from_millis(60)).await;

    assert_eq!(
        engine.play_track(Track::music("m", "Music")).unwrap(),
        PlayOutcome::Ignored
    );
    assert!(engine.is_playing());
    assert_eq!(engine.current_track(), Some(tone));
    assert_eq!(live_frequency(&context(&backend)), Some(396.0));
}

#[tokio::test(start_paused = true)]
async fn invalid_frequency_is_an_error() {
    let (engine, _backend) = engine();

    assert!(matches!(
        engine.play_track(Track::tone("bad", "Bad", -5.0)),
        Err(AudioError::InvalidFrequency(_))
    ));
    assert!(matches!(
        engine.play_track(Track::rife("bad", "Bad", vec![10.0, f32::NAN])),
        Err(AudioError::InvalidFrequency(_))
    ));
    assert!(!engine.is_playing());
    assert!(engine.current_track().is_none());
}

// ============================================================================
// FADES
// ============================================================================

#[tokio::test(start_paused = true)]
async fn fade_in_ramps_from_silence() {
    let (engine, backend) = engine();
    engine.set_volume(0.6);
    engine.play_track(Track::tone("t", "Tone", 440.0)).unwrap();
    sleep(Duration::from_millis(60)).await;

    let ctx = context(&backend);
    let voice = ctx.connected_voice_ids()[0];
    assert!(ctx.gain_value(voice).unwrap() < 1e-6, "starts silent");

    render_ms(&ctx, 50);
    let mid = ctx.gain_value(voice).unwrap();
    assert!((mid - 0.3).abs() < 0.01, "linear midpoint, got {mid}");

    render_ms(&ctx, 60);
    assert!((ctx.gain_value(voice).unwrap() - 0.6).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn fade_out_reaches_floor_then_releases() {
    let (engine, backend) = engine();
    engine.play_track(Track::tone("t", "Tone", 440.0)).unwrap();
    sleep(Duration::from_millis(60)).await;

    let ctx = context(&backend);
    let voice = ctx.connected_voice_ids()[0];
    render_ms(&ctx, 200);
    assert!((ctx.gain_value(voice).unwrap() - 0.5).abs() < 1e-6);

    engine.toggle_play().unwrap();

    render_ms(&ctx, 50);
    let mid = ctx.gain_value(voice).unwrap();
    assert!(mid < 0.5 && mid > SILENCE_FLOOR, "still fading at 50ms: {mid}");

    render_ms(&ctx, 60);
    assert!(ctx.gain_value(voice).unwrap() <= SILENCE_FLOOR + 1e-6);
    assert_eq!(ctx.connected_voices(), 1, "released only after teardown delay");

    sleep(Duration::from_millis(160)).await;
    assert_eq!(ctx.connected_voices(), 0);
    assert!(ctx.gain_value(voice).is_none());
}

// ============================================================================
// VOLUME / WAVEFORM
// ============================================================================

#[tokio::test(start_paused = true)]
async fn volume_is_clamped_and_applied_live() {
    let (engine, backend) = engine();

    assert_eq!(engine.set_volume(1.5), 1.0);
    assert_eq!(engine.set_volume(-0.2), 0.0);
    assert_eq!(engine.set_volume(f32::NAN), 0.0, "non-finite ignored");
    assert_eq!(engine.set_volume(0.4), 0.4);
    assert_eq!(engine.volume(), 0.4);

    engine.play_track(Track::tone("t", "Tone", 220.0)).unwrap();
    sleep(Duration::from_millis(60)).await;
    let ctx = context(&backend);
    let voice = ctx.connected_voice_ids()[0];
    render_ms(&ctx, 150);

    engine.set_volume(0.1);
    assert!((ctx.gain_value(voice).unwrap() - 0.1).abs() < 1e-6);
    render_ms(&ctx, 10);
    assert!((ctx.gain_value(voice).unwrap() - 0.1).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn waveform_applies_to_next_voice() {
    let (engine, backend) = engine();
    engine.set_waveform(Waveform::Square);
    engine.play_track(Track::tone("t", "Tone", 100.0)).unwrap();
    sleep(Duration::from_millis(60)).await;

    let ctx = context(&backend);
    render_ms(&ctx, 200);
    let samples = ctx.render_frames(100);
    // Square at full fade-in: every sample is +/- volume
    assert!(samples.iter().all(|s| (s.abs() - 0.5).abs() < 1e-6));
    assert_eq!(engine.waveform(), Waveform::Square);
}

// ============================================================================
// RIFE SEQUENCES
// ============================================================================

#[tokio::test(start_paused = true)]
async fn sequence_auto_advances_and_wraps() {
    let (engine, backend) = engine();
    engine.play_track(rife()).unwrap();
    sleep(Duration::from_millis(200)).await;

    let ctx = context(&backend);
    assert_eq!(live_frequency(&ctx), Some(100.0));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 1);
    assert_eq!(live_frequency(&ctx), Some(200.0));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(live_frequency(&ctx), Some(300.0));

    sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 0);
    assert_eq!(live_frequency(&ctx), Some(100.0));
    assert_eq!(ctx.stats().peak_connected, 1);
}

#[tokio::test(start_paused = true)]
async fn manual_navigation_wraps_both_ways() {
    let (engine, backend) = engine();
    assert!(matches!(engine.next_frequency(), Err(AudioError::NoSequence)));

    engine.play_track(rife()).unwrap();
    assert_eq!(engine.previous_frequency().unwrap(), 300.0);
    assert_eq!(engine.next_frequency().unwrap(), 100.0);
    assert_eq!(engine.next_frequency().unwrap(), 200.0);
    assert_eq!(engine.jump_to_frequency(2).unwrap(), 300.0);
    assert!(matches!(
        engine.jump_to_frequency(3),
        Err(AudioError::InvalidSequenceIndex { index: 3, len: 3 })
    ));

    sleep(Duration::from_millis(200)).await;
    let ctx = context(&backend);
    assert_eq!(live_frequency(&ctx), Some(300.0));
    assert_eq!(ctx.stats().voices_created, 1, "rapid steps coalesce");
}

#[tokio::test(start_paused = true)]
async fn navigation_restarts_step_timer() {
    let (engine, _backend) = engine();
    engine.play_track(rife()).unwrap();

    sleep(Duration::from_secs(4)).await;
    engine.next_frequency().unwrap();
    assert_eq!(engine.sequence_progress().unwrap().elapsed, Duration::ZERO);

    // Old timer would have fired at 5s
    sleep(Duration::from_secs(3)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 1);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 2);
}

#[tokio::test(start_paused = true)]
async fn step_duration_is_clamped() {
    let (engine, _backend) = engine();
    engine.play_track(rife()).unwrap();

    assert_eq!(
        engine.set_step_duration(Duration::from_secs(1)),
        Duration::from_secs(60)
    );
    assert_eq!(
        engine.set_step_duration(Duration::from_secs(3600)),
        Duration::from_secs(600)
    );
    assert_eq!(
        engine.set_step_duration(Duration::from_secs(90)),
        Duration::from_secs(90)
    );

    sleep(Duration::from_secs(80)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 0);
    sleep(Duration::from_secs(11)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 1);
}

#[tokio::test(start_paused = true)]
async fn auto_advance_can_be_disabled() {
    let (engine, _backend) = engine();
    assert!(matches!(
        engine.set_auto_advance(false),
        Err(AudioError::NoSequence)
    ));

    engine.play_track(rife()).unwrap();
    engine.set_auto_advance(false).unwrap();
    sleep(Duration::from_secs(20)).await;
    let progress = engine.sequence_progress().unwrap();
    assert_eq!(progress.index, 0);
    assert!(!progress.auto_advance);

    engine.set_auto_advance(true).unwrap();
    sleep(Duration::from_millis(5100)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 1);
}

#[tokio::test(start_paused = true)]
async fn manual_mode_survives_pause_and_resume() {
    let (engine, backend) = engine();
    engine.play_track(rife()).unwrap();
    engine.set_auto_advance(false).unwrap();

    assert_eq!(engine.toggle_play().unwrap(), PlayOutcome::Stopped);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.toggle_play().unwrap(), PlayOutcome::Started);

    sleep(Duration::from_secs(6)).await;
    let progress = engine.sequence_progress().unwrap();
    assert!(!progress.auto_advance);
    assert_eq!(progress.index, 0);
    assert_eq!(live_frequency(&context(&backend)), Some(100.0));

    // Also carried to the next sequence
    engine.play_track(Track::rife("rife-2", "Other", vec![400.0, 500.0])).unwrap();
    sleep(Duration::from_secs(6)).await;
    assert_eq!(engine.sequence_progress().unwrap().index, 0);
}

#[tokio::test(start_paused = true)]
async fn stopped_sequence_does_not_advance() {
    let (engine, backend) = engine();
    engine.play_track(rife()).unwrap();
    sleep(Duration::from_secs(2)).await;

    engine.toggle_play().unwrap();
    sleep(Duration::from_secs(30)).await;

    let progress = engine.sequence_progress().unwrap();
    assert_eq!(progress.index, 0);
    assert_eq!(progress.elapsed, Duration::from_secs(2), "frozen on stop");
    assert_eq!(context(&backend).connected_voices(), 0);
}

#[tokio::test(start_paused = true)]
async fn new_track_cancels_sequence_timer() {
    let (engine, backend) = engine();
    engine.play_track(rife()).unwrap();
    sleep(Duration::from_secs(1)).await;

    engine.play_track(Track::tone("t", "Tone", 639.0)).unwrap();
    assert!(engine.sequence_progress().is_none());

    sleep(Duration::from_secs(20)).await;
    assert_eq!(live_frequency(&context(&backend)), Some(639.0));
}

// ============================================================================
// EVENTS / STATUS / LIFECYCLE
// ============================================================================

#[tokio::test(start_paused = true)]
async fn play_publishes_events() {
    let (engine, _backend) = engine();
    let mut events = engine.subscribe();
    let track = rife();

    engine.play_track(track.clone()).unwrap();

    let received: Vec<EngineEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(received.contains(&EngineEvent::TrackChanged(track)));
    assert!(received.contains(&EngineEvent::StateChanged { playing: true }));
    assert!(received.contains(&EngineEvent::FrequencyChanged {
        index: Some(0),
        hz: 100.0
    }));
}

#[tokio::test(start_paused = true)]
async fn status_serializes() {
    let (engine, _backend) = engine();
    engine.play_track(rife()).unwrap();
    sleep(Duration::from_secs(1)).await;

    let status = engine.status();
    assert!(status.playing);
    assert_eq!(status.volume, 0.5);
    let progress = status.sequence.unwrap();
    assert_eq!(progress.elapsed, Duration::from_secs(1));

    let json = serde_json::to_value(engine.status()).unwrap();
    assert_eq!(json["track"]["type"], "rife");
    assert_eq!(json["waveform"], "sine");
    assert_eq!(json["sequence"]["len"], 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_and_reopens() {
    let (engine, backend) = engine();
    engine.play_track(Track::tone("t", "Tone", 852.0)).unwrap();
    sleep(Duration::from_millis(60)).await;

    engine.shutdown();
    let first = context(&backend);
    assert_eq!(first.state(), ContextState::Closed);
    assert!(!engine.is_playing());
    assert!(engine.context().is_none());

    engine.play_track(Track::tone("t2", "Tone", 963.0)).unwrap();
    sleep(Duration::from_millis(60)).await;
    assert_eq!(backend.open_count(), 2);
    assert_eq!(live_frequency(&context(&backend)), Some(963.0));
}

#[tokio::test(start_paused = true)]
async fn dropping_engine_closes_context() {
    let (engine, backend) = engine();
    engine.play_track(rife()).unwrap();
    sleep(Duration::from_millis(200)).await;

    drop(engine);
    sleep(Duration::from_secs(10)).await;

    let ctx = context(&backend);
    assert_eq!(ctx.state(), ContextState::Closed);
    assert_eq!(ctx.connected_voices(), 0);
}
