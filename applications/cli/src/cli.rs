/// Command-line interface definition
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tibrah_audio::Waveform;
use tibrah_reminders::{ReminderKind, ReminderTime};

#[derive(Debug, Parser)]
#[command(name = "tibrah")]
#[command(about = "Frequency tones, Rife sequences and daily reminders", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./tibrah.toml when present)
    #[arg(short, long, global = true, env = "TIBRAH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Play a single frequency
    Tone {
        /// Frequency in Hz
        hz: f32,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// Play a looping multi-frequency sequence
    Rife {
        /// Frequencies in Hz, played in order
        #[arg(required = true, num_args = 1..)]
        frequencies: Vec<f32>,

        /// Seconds per frequency (clamped to 60-600)
        #[arg(long)]
        step: Option<u64>,

        /// Hold the first frequency instead of advancing
        #[arg(long)]
        manual: bool,

        #[command(flatten)]
        playback: PlaybackArgs,
    },

    /// List audio output devices
    Devices,

    /// Manage and run reminders
    Reminders {
        #[command(subcommand)]
        command: ReminderCommands,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Show the recorded error log
    Errors {
        /// Clear the log after printing it
        #[arg(long)]
        clear: bool,
    },
}

/// Options shared by the playback commands
#[derive(Debug, Clone, Default, Args)]
pub struct PlaybackArgs {
    /// Stop after this many seconds (plays until Ctrl-C otherwise)
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Oscillator waveform: sine, square, sawtooth, triangle
    #[arg(short, long)]
    pub waveform: Option<Waveform>,

    /// Output volume, clamped to [0, 1]
    #[arg(short, long)]
    pub volume: Option<f32>,

    /// Output device name
    #[arg(long)]
    pub device: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ReminderCommands {
    /// List reminders
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a reminder
    Add {
        /// medication, water, meal, exercise, sleep, appointment, custom
        #[arg(short, long, default_value = "custom")]
        kind: ReminderKind,

        #[arg(short, long)]
        title: String,

        /// Local time, HH:MM
        #[arg(long)]
        time: ReminderTime,

        #[arg(short, long, default_value = "")]
        body: String,

        /// Weekdays, 0 = Sunday; every day when omitted
        #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(0..7))]
        days: Vec<u8>,
    },

    /// Enable or disable a reminder
    Toggle { id: String },

    /// Delete a reminder
    Remove { id: String },

    /// Fire reminders until Ctrl-C
    Run,
}
