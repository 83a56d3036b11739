//! stemshift - song download, stem separation, beat tracking and tempo shifting
//!
//! Downloads a song from a URL, optionally time-stretches or pitch-shifts it,
//! detects beats and downbeats, and separates it into instrument stems. The
//! heavy lifting is delegated to external tools behind swappable traits.
//!
//! # Architecture
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `acquisition`: video id extraction and audio download
//! - `audio`: decoding with symphonia, WAV output with hound
//! - `analysis`: beat/downbeat detection (stratum-dsp, madmom) and tempo math
//! - `transform`: time-stretch and pitch-shift backends
//! - `stems`: stem separation and output discovery
//! - `store`: beat data sidecar and per-track cache
//! - `pipeline`: stage planning and orchestration
//! - `server`: HTTP gateway
//!
//! # Example
//!
//! ```no_run
//! use stemshift::config::Settings;
//! use stemshift::pipeline::Orchestrator;
//! use stemshift::types::ModifyRequest;
//!
//! let orchestrator = Orchestrator::from_settings(&Settings::default()).expect("invalid settings");
//! orchestrator.prepare().expect("cannot initialize output directory");
//!
//! let track = orchestrator
//!     .acquire("https://www.youtube.com/watch?v=Br3KkvgMAZY")
//!     .expect("download failed");
//! let request = ModifyRequest {
//!     target_bpm: Some(128.0),
//!     ..ModifyRequest::default()
//! };
//! let path = orchestrator.modify_song(&track, &request).expect("modify failed");
//! println!("Wrote {}", path.display());
//! ```

pub mod acquisition;
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod stems;
pub mod store;
pub mod transform;
pub mod types;

// Re-export key types at crate root
pub use error::{Result, StemshiftError};
pub use types::{BeatAnalysis, BeatData, ModifyRequest, PcmBuffer, StemFile, Track, TrackId};
