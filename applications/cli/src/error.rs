/// CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Audio error: {0}")]
    Audio(#[from] tibrah_audio::AudioError),

    #[error("Audio device error: {0}")]
    Device(#[from] tibrah_audio_desktop::DesktopAudioError),

    #[error("Reminder error: {0}")]
    Reminder(#[from] tibrah_reminders::ReminderError),

    #[error("Storage error: {0}")]
    Storage(#[from] tibrah_core::TibrahError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
