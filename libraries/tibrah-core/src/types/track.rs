use serde::{Deserialize, Serialize};

/// How a track produces sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// One continuous tone at `frequency_hz`
    Tone,

    /// Looping sequence over `frequencies`
    Rife,

    /// Recorded music (declared, not playable by the oscillator engine)
    Music,
}

/// The unit of audio playback
///
/// Built by the caller when playback is requested and never persisted.
/// `id` is what the engine compares to decide whether a play request
/// targets the track that is already playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Tone frequency in Hz, used by [`TrackKind::Tone`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<f32>,

    /// Ordered frequencies in Hz, used by [`TrackKind::Rife`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequencies: Option<Vec<f32>>,

    #[serde(rename = "type")]
    pub kind: TrackKind,
}

impl Track {
    /// Single-tone track
    pub fn tone(id: impl Into<String>, title: impl Into<String>, frequency_hz: f32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            frequency_hz: Some(frequency_hz),
            frequencies: None,
            kind: TrackKind::Tone,
        }
    }

    /// Multi-frequency Rife sequence
    pub fn rife(id: impl Into<String>, title: impl Into<String>, frequencies: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            frequency_hz: None,
            frequencies: Some(frequencies),
            kind: TrackKind::Rife,
        }
    }

    /// Music track (no oscillator playback)
    pub fn music(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            frequency_hz: None,
            frequencies: None,
            kind: TrackKind::Music,
        }
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Frequencies for a Rife track, `None` when missing or empty
    pub fn sequence(&self) -> Option<&[f32]> {
        self.frequencies
            .as_deref()
            .filter(|frequencies| !frequencies.is_empty())
    }
}
