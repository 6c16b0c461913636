//! Tibrah Core
//!
//! Shared building blocks for the Tibrah engines:
//! - [`Track`]: the unit of audio playback (tone, Rife sequence, music)
//! - [`LocalStore`]: JSON key/value storage with whole-document reads and writes
//! - [`ErrorMonitor`]: de-duplicating error log that spills to the store
//!
//! Nothing in this crate touches audio devices or notifications; those live in
//! `tibrah-audio` and `tibrah-reminders`.

pub mod error;
pub mod monitor;
pub mod storage;
pub mod types;

pub use error::{Result, TibrahError};
pub use monitor::{ErrorMonitor, ErrorReport, ERROR_LOG_KEY};
pub use storage::LocalStore;
pub use types::{Track, TrackKind};
