//! Beat and tempo analysis
//!
//! This module provides the detector trait and concrete implementations.
//! The trait abstraction allows swapping backends without changing pipeline code.

pub mod madmom;
pub mod stratum;
pub mod tempo;
pub mod traits;

pub use madmom::MadmomBeatDetector;
pub use stratum::StratumBeatDetector;
pub use traits::BeatDetector;
