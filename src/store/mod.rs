//! Persistence of beat analysis results

pub mod cache;
pub mod sidecar;

pub use cache::TrackCache;
pub use sidecar::{BeatStore, SIDECAR_FILE};
