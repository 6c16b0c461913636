//! Audio context: the shared oscillator → gain → destination graph
//!
//! An [`AudioContext`] is a cheap, cloneable handle. The control side (the
//! engine) creates, connects and automates voices; the render side (a
//! platform callback or an offline caller) pulls interleaved samples out of
//! it. Its clock is the amount of audio rendered so far, so a suspended
//! context does not advance.
//!
//! Platform output is provided through [`AudioBackend`]; [`OfflineBackend`]
//! renders only when asked and is used by tests and headless runs.

use crate::error::{AudioError, Result};
use crate::oscillator::{Oscillator, Waveform};
use crate::param::AudioParam;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Created but not producing audio (autoplay policy default)
    Suspended,
    Running,
    /// Terminal; all voices are released
    Closed,
}

/// Identifier of a voice inside one context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(u64);

impl VoiceId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Counters for graph activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub voices_created: u64,
    pub voices_released: u64,
    /// Highest number of voices connected at the same time
    pub peak_connected: usize,
}

struct Voice {
    oscillator: Oscillator,
    gain: AudioParam,
    connected: bool,
}

struct Graph {
    state: ContextState,
    sample_rate: u32,
    channels: u16,
    frames_rendered: u64,
    voices: BTreeMap<VoiceId, Voice>,
    next_id: u64,
    stats: GraphStats,
}

impl Graph {
    fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / f64::from(self.sample_rate)
    }

    fn connected(&self) -> usize {
        self.voices.values().filter(|v| v.connected).count()
    }

    fn voice_mut(&mut self, id: VoiceId) -> Result<&mut Voice> {
        self.voices
            .get_mut(&id)
            .ok_or(AudioError::UnknownVoice(id.0))
    }
}

/// Shared handle to an audio graph
#[derive(Clone)]
pub struct AudioContext {
    graph: Arc<Mutex<Graph>>,
}

impl AudioContext {
    /// New suspended context
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            graph: Arc::new(Mutex::new(Graph {
                state: ContextState::Suspended,
                sample_rate: sample_rate.max(1),
                channels: channels.max(1),
                frames_rendered: 0,
                voices: BTreeMap::new(),
                next_id: 1,
                stats: GraphStats::default(),
            })),
        }
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ContextState {
        self.graph().state
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph().sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.graph().channels
    }

    /// Seconds of audio rendered so far
    pub fn current_time(&self) -> f64 {
        self.graph().current_time()
    }

    pub fn resume(&self) -> Result<()> {
        let mut graph = self.graph();
        match graph.state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                graph.state = ContextState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&self) -> Result<()> {
        let mut graph = self.graph();
        match graph.state {
            ContextState::Closed => Err(AudioError::ContextClosed),
            _ => {
                graph.state = ContextState::Suspended;
                Ok(())
            }
        }
    }

    /// Close the context and release every voice. Idempotent.
    pub fn close(&self) {
        let mut graph = self.graph();
        if graph.state == ContextState::Closed {
            return;
        }
        let released = graph.voices.len() as u64;
        graph.voices.clear();
        graph.stats.voices_released += released;
        graph.state = ContextState::Closed;
        tracing::debug!(released, "Audio context closed");
    }

    /// Build an unconnected, unstarted voice with unity gain
    pub fn create_voice(&self, waveform: Waveform, frequency: f32) -> Result<VoiceId> {
        let mut graph = self.graph();
        if graph.state == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }

        let oscillator = Oscillator::new(waveform, frequency)?;
        let id = VoiceId(graph.next_id);
        graph.next_id += 1;
        graph.voices.insert(
            id,
            Voice {
                oscillator,
                gain: AudioParam::default(),
                connected: false,
            },
        );
        graph.stats.voices_created += 1;

        Ok(id)
    }

    /// Route the voice to the destination
    pub fn connect(&self, id: VoiceId) -> Result<()> {
        let mut graph = self.graph();
        if graph.state == ContextState::Closed {
            return Err(AudioError::ContextClosed);
        }

        let voice = graph.voice_mut(id)?;
        if voice.connected {
            return Err(AudioError::invalid_state(format!("{id} already connected")));
        }
        voice.connected = true;

        let connected = graph.connected();
        graph.stats.peak_connected = graph.stats.peak_connected.max(connected);
        Ok(())
    }

    /// Detach the voice from the destination and release it
    pub fn disconnect(&self, id: VoiceId) -> Result<()> {
        let mut graph = self.graph();
        let voice = graph
            .voices
            .remove(&id)
            .ok_or(AudioError::UnknownVoice(id.0))?;
        graph.stats.voices_released += 1;

        if voice.connected {
            Ok(())
        } else {
            Err(AudioError::invalid_state(format!("{id} was not connected")))
        }
    }

    pub fn start_voice(&self, id: VoiceId) -> Result<()> {
        self.graph().voice_mut(id)?.oscillator.start()
    }

    pub fn stop_voice(&self, id: VoiceId) -> Result<()> {
        self.graph().voice_mut(id)?.oscillator.stop()
    }

    /// Schedule automation on a voice's gain
    ///
    /// The closure receives the parameter and the context time at the moment
    /// the graph was locked, so "now" cannot drift between reading the clock
    /// and scheduling.
    pub fn automate_gain<F>(&self, id: VoiceId, schedule: F) -> Result<()>
    where
        F: FnOnce(&mut AudioParam, f64) -> Result<()>,
    {
        let mut graph = self.graph();
        let now = graph.current_time();
        schedule(&mut graph.voice_mut(id)?.gain, now)
    }

    /// Current gain of a voice, `None` once released
    pub fn gain_value(&self, id: VoiceId) -> Option<f32> {
        let graph = self.graph();
        let now = graph.current_time();
        graph.voices.get(&id).map(|voice| voice.gain.value_at(now))
    }

    /// Frequency of a voice, `None` once released
    pub fn voice_frequency(&self, id: VoiceId) -> Option<f32> {
        self.graph()
            .voices
            .get(&id)
            .map(|voice| voice.oscillator.frequency())
    }

    /// Voices currently routed to the destination
    pub fn connected_voices(&self) -> usize {
        self.graph().connected()
    }

    /// Connected voice ids, ascending
    pub fn connected_voice_ids(&self) -> Vec<VoiceId> {
        self.graph()
            .voices
            .iter()
            .filter(|(_, voice)| voice.connected)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph().stats
    }

    /// Mix all connected voices into `output` (interleaved)
    ///
    /// Outputs silence and keeps the clock still unless running.
    pub fn render(&self, output: &mut [f32]) {
        let mut graph = self.graph();
        if graph.state != ContextState::Running {
            output.fill(0.0);
            return;
        }

        let channels = usize::from(graph.channels);
        let sample_rate = graph.sample_rate;
        let start_frame = graph.frames_rendered;
        let frames = output.len() / channels;

        for (offset, frame) in output.chunks_exact_mut(channels).enumerate() {
            let time = (start_frame + offset as u64) as f64 / f64::from(sample_rate);
            let mut mixed = 0.0_f32;
            for voice in graph.voices.values_mut().filter(|v| v.connected) {
                let sample = voice.oscillator.next_sample(sample_rate);
                mixed += sample * voice.gain.value_at(time);
            }
            frame.fill(mixed);
        }
        // Trailing partial frame, if any
        let tail = frames * channels;
        output[tail..].fill(0.0);

        graph.frames_rendered = start_frame + frames as u64;
        let now = graph.current_time();
        for voice in graph.voices.values_mut() {
            voice.gain.prune(now);
        }
    }

    /// Render `frames` frames and return them (offline use)
    pub fn render_frames(&self, frames: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; frames * usize::from(self.channels())];
        self.render(&mut buffer);
        buffer
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph();
        f.debug_struct("AudioContext")
            .field("state", &graph.state)
            .field("sample_rate", &graph.sample_rate)
            .field("channels", &graph.channels)
            .field("voices", &graph.voices.len())
            .finish()
    }
}

/// Source of audio contexts for a platform
///
/// The engine calls [`open`](AudioBackend::open) lazily, on the first play
/// request, and again if the previous context was closed.
pub trait AudioBackend: Send + Sync + 'static {
    /// Create a context wired to this backend's output
    fn open(&self) -> Result<AudioContext>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Backend whose contexts are rendered on demand
///
/// Keeps every opened context so callers can render or inspect them.
#[derive(Clone)]
pub struct OfflineBackend {
    sample_rate: u32,
    channels: u16,
    opened: Arc<Mutex<Vec<AudioContext>>>,
}

impl OfflineBackend {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Most recently opened context
    pub fn context(&self) -> Option<AudioContext> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// How many contexts have been opened
    pub fn open_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new(48_000, 2)
    }
}

impl AudioBackend for OfflineBackend {
    fn open(&self) -> Result<AudioContext> {
        let context = AudioContext::new(self.sample_rate, self.channels);
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(context.clone());
        Ok(context)
    }

    fn name(&self) -> &str {
        "offline"
    }
}
