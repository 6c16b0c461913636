//! Domain types shared across Tibrah crates

mod track;

pub use track::{Track, TrackKind};
