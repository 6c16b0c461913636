/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tibrah_audio::{EngineConfig, Waveform};

/// Default configuration file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "tibrah.toml";

/// Environment variable prefix (`TIBRAH_AUDIO__VOLUME=0.3`)
pub const ENV_PREFIX: &str = "TIBRAH";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TibrahConfig {
    #[serde(default = "default_audio")]
    pub audio: AudioSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default)]
    pub reminders: ReminderSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AudioSettings {
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub waveform: Waveform,

    /// Hold time per frequency of a Rife sequence
    #[serde(default = "default_step_duration_secs")]
    pub step_duration_secs: u64,

    /// Output device name; the system default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Directory holding the reminder list and the error log
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReminderSettings {
    /// Icon attached to reminder notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Default for TibrahConfig {
    fn default() -> Self {
        Self {
            audio: default_audio(),
            storage: default_storage(),
            reminders: ReminderSettings::default(),
        }
    }
}

impl TibrahConfig {
    /// Load from `path` (or `tibrah.toml` if it exists) and `TIBRAH_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    /// Load with an explicit environment source
    pub fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            // An explicitly named file must exist
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(env);

        let config: Self = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.audio.volume) {
            return Err(CliError::Config(format!(
                "audio.volume must be within [0, 1], got {}",
                self.audio.volume
            )));
        }
        if self.audio.step_duration_secs == 0 {
            return Err(CliError::Config(
                "audio.step_duration_secs must be non-zero".to_string(),
            ));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(CliError::Config("storage.data_dir is empty".to_string()));
        }
        Ok(())
    }

    /// Engine settings; fade and delay timings keep their defaults
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            volume: self.audio.volume,
            waveform: self.audio.waveform,
            step_duration: Duration::from_secs(self.audio.step_duration_secs),
            ..EngineConfig::default()
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}

/// `TIBRAH_<SECTION>__<KEY>`; the double underscore keeps keys like
/// `step_duration_secs` intact
pub fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// Default values

fn default_audio() -> AudioSettings {
    AudioSettings {
        volume: default_volume(),
        waveform: Waveform::default(),
        step_duration_secs: default_step_duration_secs(),
        device: None,
    }
}

fn default_volume() -> f32 {
    0.5
}

fn default_step_duration_secs() -> u64 {
    tibrah_audio::DEFAULT_STEP_DURATION.as_secs()
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.tibrah")
}
