//! Oscillator playback engine
//!
//! Owns the single audio context and the single live voice. Every change of
//! frequency or track is a teardown followed by a fresh voice:
//!
//! 1. stop: abort the sequence timer, fade the live gain to
//!    [`SILENCE_FLOOR`](crate::config::SILENCE_FLOOR), release the voice
//!    after the teardown delay
//! 2. start: after the start delay (and once any fading voice is released)
//!    build a voice, ramp its gain up from silence, start it
//!
//! Delayed work runs on tokio tasks that hold only a weak reference to the
//! engine, so dropping the last [`AudioEngine`] handle tears everything down.

use crate::config::{clamp_step_duration, EngineConfig, SILENCE_FLOOR};
use crate::context::{AudioBackend, AudioContext, ContextState, VoiceId};
use crate::error::{AudioError, Result};
use crate::events::{EngineEvent, EngineStatus};
use crate::oscillator::{validate_frequency, Waveform};
use crate::sequence::{RifeSequence, StepProgress};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tibrah_core::{Track, TrackKind};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What a play request resulted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback (re)started
    Started,
    /// The request stopped the active track
    Stopped,
    /// Nothing playable; state unchanged
    Ignored,
}

/// How a track maps onto the oscillator
#[derive(Debug)]
enum PlaybackPlan {
    Tone(f32),
    Sequence(Vec<f32>),
}

impl PlaybackPlan {
    /// `Err` carries the reason a track cannot be synthesized
    fn for_track(track: &Track) -> std::result::Result<Self, &'static str> {
        match track.kind {
            TrackKind::Tone => track
                .frequency_hz
                .map(PlaybackPlan::Tone)
                .ok_or("tone track has no frequency_hz"),
            TrackKind::Rife => track
                .sequence()
                .map(|frequencies| PlaybackPlan::Sequence(frequencies.to_vec()))
                .ok_or("rife track has no frequencies"),
            TrackKind::Music => Err("music tracks are not synthesized"),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            PlaybackPlan::Tone(hz) => validate_frequency(*hz).map(drop),
            PlaybackPlan::Sequence(frequencies) => frequencies
                .iter()
                .try_for_each(|hz| validate_frequency(*hz).map(drop)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopMode {
    /// Exponential fade, release after the teardown delay
    Fade,
    /// Immediate stop and release
    Hard,
}

struct EngineState {
    context: Option<AudioContext>,
    current_track: Option<Track>,
    is_playing: bool,
    volume: f32,
    waveform: Waveform,
    step_duration: Duration,
    /// Player setting; survives pause/resume and applies to later sequences
    auto_advance: bool,

    /// Live voice, at most one
    voice: Option<VoiceId>,
    /// Voices fading out, waiting for release
    fading: Vec<VoiceId>,
    /// Latest release deadline among `fading`
    teardown_until: Option<Instant>,

    sequence: Option<RifeSequence>,
    sequence_timer: Option<JoinHandle<()>>,
    /// Bumped whenever a sequence starts or stops; stale ticks compare it
    sequence_epoch: u64,

    pending_start: Option<JoinHandle<()>>,
    /// Bumped on every start/stop; stale delayed starts compare it
    generation: u64,
}

struct Shared {
    backend: Box<dyn AudioBackend>,
    config: EngineConfig,
    runtime: Handle,
    state: Mutex<EngineState>,
    events: broadcast::Sender<EngineEvent>,
}

/// Handle to the oscillator engine
///
/// Cloning is cheap and every clone controls the same engine. Control
/// methods are synchronous; delayed work runs on the tokio runtime captured
/// at construction.
#[derive(Clone)]
pub struct AudioEngine {
    shared: Arc<Shared>,
}

impl AudioEngine {
    /// Create an engine on the current tokio runtime
    ///
    /// No audio context is opened until the first play request.
    pub fn new(backend: impl AudioBackend, config: EngineConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| AudioError::NoRuntime)?;
        Self::with_runtime(backend, config, runtime)
    }

    /// Create an engine that schedules its timers on `runtime`
    pub fn with_runtime(
        backend: impl AudioBackend,
        config: EngineConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);

        tracing::debug!(backend = backend.name(), "Audio engine created");

        let state = EngineState {
            context: None,
            current_track: None,
            is_playing: false,
            volume: config.volume,
            waveform: config.waveform,
            step_duration: config.step_duration,
            auto_advance: true,
            voice: None,
            fading: Vec::new(),
            teardown_until: None,
            sequence: None,
            sequence_timer: None,
            sequence_epoch: 0,
            pending_start: None,
            generation: 0,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                backend: Box::new(backend),
                config,
                runtime,
                state: Mutex::new(state),
                events,
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Play `track`, or stop it if it is the one already playing
    pub fn play_track(&self, track: Track) -> Result<PlayOutcome> {
        self.shared.play_track(track)
    }

    /// Stop with a fade (keeping the track) or replay the remembered track
    pub fn toggle_play(&self) -> Result<PlayOutcome> {
        let replay = {
            let mut state = self.shared.lock();
            if state.is_playing {
                self.shared.stop_locked(&mut state, StopMode::Fade);
                self.shared.mark_stopped(&mut state);
                return Ok(PlayOutcome::Stopped);
            }
            state.current_track.clone()
        };

        match replay {
            Some(track) => self.shared.play_track(track),
            None => Ok(PlayOutcome::Ignored),
        }
    }

    /// Hard stop and forget the active track
    pub fn close_player(&self) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state, StopMode::Hard);
        state.is_playing = false;
        state.current_track = None;
        state.sequence = None;
        tracing::info!("Player closed");
        self.shared.emit(EngineEvent::Stopped);
    }

    /// Set volume, clamped to `[0, 1]`; returns the applied level
    ///
    /// Applied to the live voice at once, otherwise used by the next voice.
    /// Non-finite input is ignored.
    pub fn set_volume(&self, level: f32) -> f32 {
        let mut state = self.shared.lock();
        if !level.is_finite() {
            tracing::warn!(level, "Ignoring non-finite volume");
            return state.volume;
        }

        let level = level.clamp(0.0, 1.0);
        state.volume = level;

        if let (Some(context), Some(voice)) = (&state.context, state.voice) {
            let applied = context.automate_gain(voice, |gain, now| {
                gain.cancel_scheduled_values(now)?;
                gain.set_value_at_time(level, now)
            });
            if let Err(e) = applied {
                tracing::debug!(error = %e, "Volume not applied to live voice");
            }
        }

        self.shared.emit(EngineEvent::VolumeChanged(level));
        level
    }

    pub fn volume(&self) -> f32 {
        self.shared.lock().volume
    }

    /// Waveform for voices started from now on
    pub fn set_waveform(&self, waveform: Waveform) {
        self.shared.lock().waveform = waveform;
    }

    pub fn waveform(&self) -> Waveform {
        self.shared.lock().waveform
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().is_playing
    }

    pub fn current_track(&self) -> Option<Track> {
        self.shared.lock().current_track.clone()
    }

    /// The audio context, once opened
    pub fn context(&self) -> Option<AudioContext> {
        self.shared.lock().context.clone()
    }

    /// Step forward in the loaded sequence
    pub fn next_frequency(&self) -> Result<f32> {
        self.shared
            .navigate(|sequence, now| Ok(sequence.next(now)))
    }

    /// Step back in the loaded sequence
    pub fn previous_frequency(&self) -> Result<f32> {
        self.shared
            .navigate(|sequence, now| Ok(sequence.previous(now)))
    }

    /// Jump to `index` in the loaded sequence
    pub fn jump_to_frequency(&self, index: usize) -> Result<f32> {
        self.shared
            .navigate(|sequence, now| sequence.jump_to(index, now))
    }

    /// Enable or disable timer-driven advancing
    ///
    /// Kept for the rest of the session: resuming or starting another
    /// sequence uses the same setting.
    pub fn set_auto_advance(&self, enabled: bool) -> Result<()> {
        let mut state = self.shared.lock();
        if state.sequence.is_none() {
            return Err(AudioError::NoSequence);
        }
        state.auto_advance = enabled;
        let playing = state.is_playing;
        let sequence = state.sequence.as_mut().ok_or(AudioError::NoSequence)?;
        sequence.set_auto_advance(enabled);

        if enabled && playing {
            sequence.restart_step(Instant::now());
            self.shared.arm_sequence_timer(&mut state);
        } else if !enabled {
            if let Some(timer) = state.sequence_timer.take() {
                timer.abort();
            }
        }
        Ok(())
    }

    /// Per-frequency hold time, clamped to 60–600 s; returns the applied value
    ///
    /// Applies to the loaded sequence (restarting its step clock) and to
    /// sequences started later.
    pub fn set_step_duration(&self, duration: Duration) -> Duration {
        let duration = clamp_step_duration(duration);
        let mut state = self.shared.lock();
        state.step_duration = duration;
        let playing = state.is_playing;

        let rearm = match state.sequence.as_mut() {
            Some(sequence) => {
                sequence.set_step_duration(duration);
                sequence.restart_step(Instant::now());
                sequence.auto_advance() && playing
            }
            None => false,
        };
        if rearm {
            self.shared.arm_sequence_timer(&mut state);
        }
        duration
    }

    pub fn sequence_progress(&self) -> Option<StepProgress> {
        let state = self.shared.lock();
        state
            .sequence
            .as_ref()
            .map(|sequence| sequence.progress(Instant::now()))
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.shared.lock();
        EngineStatus {
            track: state.current_track.clone(),
            playing: state.is_playing,
            volume: state.volume,
            waveform: state.waveform,
            sequence: state
                .sequence
                .as_ref()
                .map(|sequence| sequence.progress(Instant::now())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Stop everything and close the audio context
    ///
    /// A later play request opens a fresh context.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        self.shared.stop_locked(&mut state, StopMode::Hard);
        state.is_playing = false;
        if let Some(context) = state.context.take() {
            context.close();
        }
        tracing::info!("Audio engine shut down");
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine
        self.events.send(event).ok();
    }

    fn play_track(self: &Arc<Self>, track: Track) -> Result<PlayOutcome> {
        let mut state = self.lock();

        let same_track = state
            .current_track
            .as_ref()
            .is_some_and(|current| current.id == track.id);
        if same_track && state.is_playing {
            tracing::info!(track = %track.id, "Play on active track, stopping");
            self.stop_locked(&mut state, StopMode::Fade);
            self.mark_stopped(&mut state);
            return Ok(PlayOutcome::Stopped);
        }

        let plan = match PlaybackPlan::for_track(&track) {
            Ok(plan) => plan,
            Err(reason) => {
                tracing::warn!(track = %track.id, kind = ?track.kind, reason, "Track not playable");
                return Ok(PlayOutcome::Ignored);
            }
        };
        plan.validate()?;

        // Timer first: no pending tick may restart the old sequence
        self.clear_sequence(&mut state);

        tracing::info!(track = %track.id, title = %track.title, "Playing track");
        state.current_track = Some(track.clone());
        state.is_playing = true;

        let started = match plan {
            PlaybackPlan::Tone(hz) => self.play_tone(&mut state, hz, None),
            PlaybackPlan::Sequence(frequencies) => self.start_sequence(&mut state, frequencies),
        };

        if let Err(e) = started {
            tracing::warn!(error = %e, "Playback failed to start");
            self.stop_locked(&mut state, StopMode::Hard);
            state.is_playing = false;
            return Err(e);
        }

        self.emit(EngineEvent::TrackChanged(track));
        self.emit(EngineEvent::StateChanged { playing: true });
        Ok(PlayOutcome::Started)
    }

    fn mark_stopped(&self, state: &mut EngineState) {
        state.is_playing = false;
        if let Some(sequence) = state.sequence.as_mut() {
            sequence.freeze(Instant::now());
        }
        self.emit(EngineEvent::StateChanged { playing: false });
    }

    fn start_sequence(self: &Arc<Self>, state: &mut EngineState, frequencies: Vec<f32>) -> Result<()> {
        let mut sequence = RifeSequence::new(frequencies, state.step_duration, Instant::now())?;
        sequence.set_auto_advance(state.auto_advance);
        let hz = sequence.current_frequency();
        tracing::debug!(
            steps = sequence.len(),
            step = ?sequence.step_duration(),
            "Starting frequency sequence"
        );

        state.sequence = Some(sequence);
        self.play_tone(state, hz, Some(0))?;
        self.arm_sequence_timer(state);
        Ok(())
    }

    /// Abort the sequence timer and drop the sequence
    fn clear_sequence(&self, state: &mut EngineState) {
        if let Some(timer) = state.sequence_timer.take() {
            timer.abort();
        }
        state.sequence_epoch += 1;
        state.sequence = None;
    }

    /// (Re)start the advance timer for the loaded sequence
    fn arm_sequence_timer(self: &Arc<Self>, state: &mut EngineState) {
        if let Some(timer) = state.sequence_timer.take() {
            timer.abort();
        }
        let Some(sequence) = state.sequence.as_ref() else {
            return;
        };
        if !sequence.auto_advance() {
            return;
        }

        state.sequence_epoch += 1;
        let epoch = state.sequence_epoch;
        let period = sequence.step_duration();
        let engine = Arc::downgrade(self);

        state.sequence_timer = Some(self.runtime.spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let Some(engine) = Weak::upgrade(&engine) else {
                    break;
                };
                if !engine.advance_sequence(epoch) {
                    break;
                }
            }
        }));
    }

    /// Timer tick; false once the sequence this timer belongs to is gone
    fn advance_sequence(self: &Arc<Self>, epoch: u64) -> bool {
        let mut state = self.lock();
        if state.sequence_epoch != epoch || !state.is_playing {
            return false;
        }
        let Some(sequence) = state.sequence.as_mut() else {
            return false;
        };

        let hz = sequence.advance(Instant::now());
        let index = sequence.index();
        tracing::debug!(index, hz, "Sequence advanced");

        match self.play_tone(&mut state, hz, Some(index)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Sequence step failed, stopping sequence");
                false
            }
        }
    }

    fn navigate<F>(self: &Arc<Self>, step: F) -> Result<f32>
    where
        F: FnOnce(&mut RifeSequence, Instant) -> Result<f32>,
    {
        let mut state = self.lock();
        let sequence = state.sequence.as_mut().ok_or(AudioError::NoSequence)?;
        let hz = step(sequence, Instant::now())?;
        let index = sequence.index();

        if state.is_playing {
            self.play_tone(&mut state, hz, Some(index))?;
            // Full hold time for the newly selected step
            self.arm_sequence_timer(&mut state);
        }
        Ok(hz)
    }

    /// Open the context on first use (or after close) and make sure it runs
    fn ensure_context(&self, state: &mut EngineState) -> Result<AudioContext> {
        let reusable = state
            .context
            .as_ref()
            .filter(|context| context.state() != ContextState::Closed)
            .cloned();

        let context = match reusable {
            Some(context) => context,
            None => {
                let context = self.backend.open()?;
                tracing::info!(
                    backend = self.backend.name(),
                    sample_rate = context.sample_rate(),
                    "Audio context opened"
                );
                state.context = Some(context.clone());
                // Voices of a closed context are gone with it
                state.voice = None;
                state.fading.clear();
                state.teardown_until = None;
                context
            }
        };

        if context.state() == ContextState::Suspended {
            context.resume()?;
        }
        Ok(context)
    }

    /// Tone synthesis: tear down the live voice, schedule a new one
    fn play_tone(self: &Arc<Self>, state: &mut EngineState, hz: f32, index: Option<usize>) -> Result<()> {
        let hz = validate_frequency(hz)?;
        self.ensure_context(state)?;
        self.stop_voice(state, StopMode::Fade);

        state.generation += 1;
        let generation = state.generation;

        let mut start_at = Instant::now() + self.config.start_delay;
        if let Some(teardown) = state.teardown_until {
            start_at = start_at.max(teardown);
        }

        let engine = Arc::downgrade(self);
        state.pending_start = Some(self.runtime.spawn(async move {
            tokio::time::sleep_until(start_at).await;
            if let Some(engine) = Weak::upgrade(&engine) {
                engine.start_voice(generation, hz);
            }
        }));

        self.emit(EngineEvent::FrequencyChanged { index, hz });
        Ok(())
    }

    /// Delayed half of tone synthesis
    fn start_voice(&self, generation: u64, hz: f32) {
        let mut state = self.lock();
        if state.generation != generation || !state.is_playing {
            tracing::debug!(generation, "Superseded start dropped");
            return;
        }
        state.pending_start = None;

        let Some(context) = state.context.clone() else {
            return;
        };

        // One voice at a time, whatever the timers did
        for voice in state.fading.drain(..) {
            release(&context, voice);
        }
        state.teardown_until = None;
        if let Some(voice) = state.voice.take() {
            release(&context, voice);
        }

        let volume = state.volume;
        let fade_in = self.config.fade_in.as_secs_f64();
        let built = context
            .create_voice(state.waveform, hz)
            .and_then(|voice| {
                let wired = context
                    .automate_gain(voice, |gain, now| {
                        gain.set_value_at_time(0.0, now)?;
                        gain.linear_ramp_to_value_at_time(volume, now + fade_in)
                    })
                    .and_then(|()| context.connect(voice))
                    .and_then(|()| context.start_voice(voice));
                match wired {
                    Ok(()) => Ok(voice),
                    Err(e) => {
                        release(&context, voice);
                        Err(e)
                    }
                }
            });

        match built {
            Ok(voice) => {
                tracing::debug!(%voice, hz, waveform = %state.waveform, "Voice started");
                state.voice = Some(voice);
            }
            Err(e) => tracing::warn!(error = %e, hz, "Voice failed to start"),
        }
    }

    /// Stop path: sequence timer first, then the voice
    fn stop_locked(self: &Arc<Self>, state: &mut EngineState, mode: StopMode) {
        if let Some(timer) = state.sequence_timer.take() {
            timer.abort();
        }
        state.sequence_epoch += 1;
        state.generation += 1;
        self.stop_voice(state, mode);

        if mode == StopMode::Hard {
            if let Some(context) = state.context.clone() {
                for voice in state.fading.drain(..) {
                    release(&context, voice);
                }
            }
            state.teardown_until = None;
        }
    }

    /// Tear down the live voice and cancel any pending start
    fn stop_voice(self: &Arc<Self>, state: &mut EngineState, mode: StopMode) {
        if let Some(pending) = state.pending_start.take() {
            pending.abort();
        }
        let Some(voice) = state.voice.take() else {
            return;
        };
        let Some(context) = state.context.clone() else {
            return;
        };

        if mode == StopMode::Hard {
            release(&context, voice);
            return;
        }

        let fade_out = self.config.fade_out.as_secs_f64();
        let faded = context.automate_gain(voice, |gain, now| {
            let current = gain.value_at(now);
            gain.cancel_scheduled_values(now)?;
            gain.set_value_at_time(current, now)?;
            gain.exponential_ramp_to_value_at_time(SILENCE_FLOOR, now + fade_out)
        });

        if let Err(e) = faded {
            tracing::debug!(error = %e, %voice, "Fade unavailable, hard stop");
            release(&context, voice);
            return;
        }

        let deadline = Instant::now() + self.config.teardown_delay;
        state.fading.push(voice);
        state.teardown_until = Some(state.teardown_until.map_or(deadline, |t| t.max(deadline)));

        let engine = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            match Weak::upgrade(&engine) {
                Some(engine) => engine.finish_fade(&context, voice),
                None => release(&context, voice),
            }
        });
    }

    fn finish_fade(&self, context: &AudioContext, voice: VoiceId) {
        let mut state = self.lock();
        if let Some(position) = state.fading.iter().position(|v| *v == voice) {
            state.fading.remove(position);
            release(context, voice);
        }
        if state.fading.is_empty() {
            state.teardown_until = None;
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.sequence_timer.take() {
            timer.abort();
        }
        if let Some(pending) = state.pending_start.take() {
            pending.abort();
        }
        if let Some(context) = state.context.take() {
            context.close();
        }
    }
}

/// Stop and disconnect, ignoring lifecycle errors
///
/// Stopping an unstarted or already stopped oscillator, or releasing a voice
/// that is already gone, is not a failure here.
fn release(context: &AudioContext, voice: VoiceId) {
    if let Err(e) = context.stop_voice(voice) {
        tracing::trace!(error = %e, %voice, "Ignored stop error");
    }
    if let Err(e) = context.disconnect(voice) {
        tracing::trace!(error = %e, %voice, "Ignored disconnect error");
    }
}
