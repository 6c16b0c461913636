/// Desktop output errors
use thiserror::Error;

/// Result type for desktop output
pub type Result<T> = std::result::Result<T, DesktopAudioError>;

/// Desktop output errors
#[derive(Debug, Error)]
pub enum DesktopAudioError {
    /// No output device (or none matching the requested name)
    #[error("Audio device not found: {}", .0.as_deref().unwrap_or("default output"))]
    DeviceNotFound(Option<String>),

    /// Device enumeration or query failed
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Failed to query the default output configuration
    #[error("Output config error: {0}")]
    ConfigError(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuildError(String),

    /// Failed to play stream
    #[error("Failed to play stream: {0}")]
    PlayError(String),

    /// Device sample format the renderer cannot write
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The stream thread could not be started or died during setup
    #[error("Audio thread error: {0}")]
    ThreadError(String),
}

impl From<cpal::BuildStreamError> for DesktopAudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        DesktopAudioError::StreamBuildError(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DesktopAudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        DesktopAudioError::PlayError(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for DesktopAudioError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        DesktopAudioError::ConfigError(err.to_string())
    }
}

impl From<cpal::DevicesError> for DesktopAudioError {
    fn from(err: cpal::DevicesError) -> Self {
        DesktopAudioError::DeviceError(err.to_string())
    }
}

impl From<DesktopAudioError> for tibrah_audio::AudioError {
    fn from(err: DesktopAudioError) -> Self {
        tibrah_audio::AudioError::backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_names_device() {
        assert_eq!(
            DesktopAudioError::DeviceNotFound(None).to_string(),
            "Audio device not found: default output"
        );
        assert_eq!(
            DesktopAudioError::DeviceNotFound(Some("USB DAC".into())).to_string(),
            "Audio device not found: USB DAC"
        );
    }

    #[test]
    fn converts_to_engine_backend_error() {
        let err: tibrah_audio::AudioError =
            DesktopAudioError::UnsupportedFormat("u8".into()).into();
        assert!(matches!(err, tibrah_audio::AudioError::Backend(msg) if msg.contains("u8")));
    }
}
