//! Core data types for stemshift
//!
//! These types represent the domain model and flow through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Tracks
// =============================================================================

/// Stable identifier of a track, derived from its source URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A locally available audio file
///
/// The raw file is never modified; every stage writes a new derived file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Identifier, when the track came from Media Acquisition
    pub id: Option<TrackId>,
    /// Path to the audio file
    pub path: PathBuf,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            path: path.into(),
        }
    }

    pub fn with_id(id: TrackId, path: impl Into<PathBuf>) -> Self {
        Self {
            id: Some(id),
            path: path.into(),
        }
    }

    /// File name without its extension ("Br3KkvgMAZY" for "Br3KkvgMAZY.wav")
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("track")
            .to_string()
    }

    /// Same track identity, different file (used when a stage produces a new artifact)
    pub fn derive(&self, path: impl Into<PathBuf>) -> Self {
        Self {
            id: self.id.clone(),
            path: path.into(),
        }
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// What a derived file on disk represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Raw,
    Stretched,
    PitchShifted,
    Stem(String),
}

impl ArtifactKind {
    /// File name suffix appended to the input's base name
    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Raw | ArtifactKind::Stem(_) => "",
            ArtifactKind::Stretched => "_stretched",
            ArtifactKind::PitchShifted => "_final",
        }
    }
}

/// A file produced (or consumed) by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// One separated stem on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemFile {
    /// Stem name as written by the separator ("vocals", "drums", ...)
    pub name: String,
    pub path: PathBuf,
}

impl StemFile {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            path: path.to_path_buf(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Which of the three independent modifications to apply to a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// Resolve against the measured tempo; takes precedence over `stretch_ratio`
    pub target_bpm: Option<f64>,
    /// Explicit tempo factor (> 1 is faster)
    pub stretch_ratio: Option<f64>,
    pub pitch_shift_semitones: Option<f64>,
}

impl ModifyRequest {
    pub fn is_noop(&self) -> bool {
        self.target_bpm.is_none()
            && self.stretch_ratio.is_none()
            && self.pitch_shift_semitones.is_none()
    }
}

// =============================================================================
// Beat analysis
// =============================================================================

/// The Beat Data Record persisted in `beat_data.json`
///
/// `beats` and `bpm` are written by separate calls; updating one never touches the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatData {
    /// Beat (or downbeat) times in seconds
    #[serde(default)]
    pub beats: Vec<f64>,
    /// Last measured tempo, 0.0 until one has been measured
    #[serde(default)]
    pub bpm: f64,
    /// Track that performed the most recent write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for BeatData {
    fn default() -> Self {
        Self {
            beats: Vec::new(),
            bpm: 0.0,
            track_id: None,
            updated_at: None,
        }
    }
}

/// Result of a beat detection call, returned directly to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatAnalysis {
    pub beats: Vec<f64>,
    /// `None` when fewer than two beats were found
    pub bpm: Option<f64>,
}

/// Frame-wise detector output
#[derive(Debug, Clone, PartialEq)]
pub struct Activations {
    /// Analysis frames per second
    pub frame_rate: f64,
    /// Beat activation per frame, in [0, 1]
    pub beat: Vec<f32>,
    /// Downbeat confidence per frame, in [0, 1]
    pub downbeat: Vec<f32>,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded PCM at the source's native rate and channel layout
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        // Guard against division by zero - use 0 duration for invalid sample rate
        if self.sample_rate > 0 {
            self.frames() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        if channels == 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_base_name() {
        let track = Track::new("resources/tmp/Br3KkvgMAZY.wav");
        assert_eq!(track.base_name(), "Br3KkvgMAZY");
    }

    #[test]
    fn test_derive_keeps_id() {
        let track = Track::with_id(TrackId::new("abc"), "abc.wav");
        let derived = track.derive("abc_stretched.wav");
        assert_eq!(derived.id, Some(TrackId::new("abc")));
        assert_eq!(derived.path, PathBuf::from("abc_stretched.wav"));
    }

    #[test]
    fn test_pcm_to_mono() {
        let buffer = PcmBuffer::new(vec![0.5, 0.3, 0.8, 0.2, 1.0, 0.0], 2, 44100);
        let mono = buffer.to_mono();
        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.4).abs() < 0.001);
        assert!((mono[1] - 0.5).abs() < 0.001);
        assert!((mono[2] - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_pcm_duration() {
        let buffer = PcmBuffer::new(vec![0.0; 88200], 2, 44100);
        assert_eq!(buffer.frames(), 44100);
        assert!((buffer.duration() - 1.0).abs() < 1e-9);
        assert_eq!(PcmBuffer::new(vec![0.0; 10], 1, 0).duration(), 0.0);
    }

    #[test]
    fn test_beat_data_defaults_from_minimal_json() {
        let data: BeatData = serde_json::from_str(r#"{"beats": [0.5, 1.0]}"#).unwrap();
        assert_eq!(data.beats, vec![0.5, 1.0]);
        assert_eq!(data.bpm, 0.0);
        assert!(data.track_id.is_none());
    }

    #[test]
    fn test_modify_request_noop() {
        assert!(ModifyRequest::default().is_noop());
        let request = ModifyRequest {
            pitch_shift_semitones: Some(2.0),
            ..Default::default()
        };
        assert!(!request.is_noop());
    }
}
