//! Stratum-DSP based beat tracking
//!
//! In-process backend using the stratum-dsp beat grid: HMM beat tracking
//! over energy-flux onsets, with downbeats every bar. Needs no external tools.

use super::traits::BeatDetector;
use crate::audio;
use crate::error::{Result, StemshiftError};
use crate::types::{Activations, PcmBuffer};
use std::path::Path;
use stratum_dsp::{analyze_audio, AnalysisConfig};
use tracing::debug;

/// Beat grid of one track, in seconds on the file's own timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedGrid {
    pub beats: Vec<f64>,
    pub downbeats: Vec<f64>,
    /// Tempo confidence in [0, 1]
    pub confidence: f32,
    /// Length of the analysed audio
    pub duration: f64,
}

impl TrackedGrid {
    /// Place the grid on frames of `hop_seconds`
    ///
    /// Beat frames carry the tempo confidence in the beat activation, downbeat
    /// frames carry it in both activations. Every other frame is zero.
    pub fn to_activations(&self, hop_seconds: f64) -> Activations {
        let num_frames = if hop_seconds > 0.0 {
            (self.duration / hop_seconds).ceil() as usize
        } else {
            0
        };
        let mut beat = vec![0.0f32; num_frames];
        let mut downbeat = vec![0.0f32; num_frames];
        let confidence = self.confidence.clamp(0.0, 1.0);

        for &t in &self.beats {
            if let Some(frame) = frame_index(t, hop_seconds, num_frames) {
                beat[frame] = confidence;
            }
        }
        for &t in &self.downbeats {
            if let Some(frame) = frame_index(t, hop_seconds, num_frames) {
                beat[frame] = confidence;
                downbeat[frame] = confidence;
            }
        }

        Activations {
            frame_rate: 1.0 / hop_seconds,
            beat,
            downbeat,
        }
    }
}

fn frame_index(t: f64, hop_seconds: f64, num_frames: usize) -> Option<usize> {
    if !t.is_finite() || t < 0.0 {
        return None;
    }
    let frame = (t / hop_seconds).round() as usize;
    (frame < num_frames).then_some(frame)
}

/// Beat detector using stratum-dsp
pub struct StratumBeatDetector {
    /// Seconds per activation frame
    hop_seconds: f64,
}

impl StratumBeatDetector {
    pub fn new(hop_seconds: f64) -> Self {
        Self { hop_seconds }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            // Trimming would shift beat times off the file's timeline
            enable_silence_trimming: false,
            ..AnalysisConfig::default()
        }
    }

    /// Track the beat grid of an already decoded buffer
    pub fn track(&self, buffer: &PcmBuffer, path: &Path) -> Result<TrackedGrid> {
        debug!(
            "Tracking beats with stratum-dsp ({} frames, {}Hz)",
            buffer.frames(),
            buffer.sample_rate
        );

        let mono = buffer.to_mono();
        let result = analyze_audio(&mono, buffer.sample_rate, Self::config()).map_err(|e| {
            StemshiftError::Detection {
                path: path.to_path_buf(),
                reason: format!("beat tracking failed: {}", e),
            }
        })?;

        debug!(
            "stratum-dsp: {:.2} BPM (confidence {:.2}), {} beats, {} downbeats",
            result.bpm,
            result.bpm_confidence,
            result.beat_grid.beats.len(),
            result.beat_grid.downbeats.len()
        );

        Ok(TrackedGrid {
            beats: result.beat_grid.beats.iter().map(|&t| t as f64).collect(),
            downbeats: result.beat_grid.downbeats.iter().map(|&t| t as f64).collect(),
            confidence: result.bpm_confidence,
            duration: buffer.duration(),
        })
    }
}

impl Default for StratumBeatDetector {
    fn default() -> Self {
        Self::new(crate::config::settings::DEFAULT_HOP_SECONDS)
    }
}

impl BeatDetector for StratumBeatDetector {
    fn beats(&self, path: &Path) -> Result<Vec<f64>> {
        let buffer = audio::decode(path)?;
        Ok(self.track(&buffer, path)?.beats)
    }

    fn activations(&self, path: &Path) -> Result<Activations> {
        let buffer = audio::decode(path)?;
        Ok(self.track(&buffer, path)?.to_activations(self.hop_seconds))
    }

    fn name(&self) -> &'static str {
        "stratum-dsp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TrackedGrid {
        TrackedGrid {
            beats: vec![0.0, 0.5, 1.0, 1.5, 2.0],
            downbeats: vec![0.0, 2.0],
            confidence: 0.8,
            duration: 2.5,
        }
    }

    #[test]
    fn test_stratum_detector_name() {
        assert_eq!(StratumBeatDetector::default().name(), "stratum-dsp");
    }

    #[test]
    fn test_grid_activations_use_hop() {
        let acts = grid().to_activations(0.01);
        assert!((acts.frame_rate - 100.0).abs() < 1e-9);
        assert_eq!(acts.beat.len(), 250);
        assert_eq!(acts.downbeat.len(), 250);
    }

    #[test]
    fn test_grid_activations_mark_beats_and_downbeats() {
        let acts = grid().to_activations(0.01);

        let beat_frames: Vec<usize> = (0..acts.beat.len()).filter(|&i| acts.beat[i] > 0.0).collect();
        assert_eq!(beat_frames, vec![0, 50, 100, 150, 200]);

        let downbeat_frames: Vec<usize> =
            (0..acts.downbeat.len()).filter(|&i| acts.downbeat[i] > 0.0).collect();
        assert_eq!(downbeat_frames, vec![0, 200]);
        assert!((acts.downbeat[200] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_grid_activations_gate_to_downbeats() {
        let acts = grid().to_activations(0.01);
        let times = crate::analysis::tempo::downbeat_times(&acts, 0.5, 0.01);
        assert_eq!(times.len(), 2);
        assert!((times[1] - 2.0).abs() < 1e-9);

        assert!(crate::analysis::tempo::downbeat_times(&acts, 0.9, 0.01).is_empty());
    }

    #[test]
    fn test_grid_times_outside_track_are_dropped() {
        let grid = TrackedGrid {
            beats: vec![-0.1, 0.25, 3.0, f64::NAN],
            downbeats: vec![],
            confidence: 1.0,
            duration: 1.0,
        };
        let acts = grid.to_activations(0.01);
        assert_eq!(acts.beat.iter().filter(|&&v| v > 0.0).count(), 1);
        assert_eq!(acts.beat[25], 1.0);
    }

    #[test]
    fn test_silence_is_not_tracked() {
        let detector = StratumBeatDetector::default();
        let buffer = PcmBuffer::new(vec![0.0; 44100 * 4], 1, 44100);
        let beats = detector
            .track(&buffer, Path::new("silence.wav"))
            .map(|grid| grid.beats)
            .unwrap_or_default();
        assert!(beats.is_empty());
    }
}
