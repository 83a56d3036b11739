//! Tempo math over detector output
//!
//! Everything here is pure: beat times and activations in, numbers out.

use crate::types::Activations;

/// Tempo from beat times: `60 / mean(consecutive deltas)`
///
/// Returns `None` for fewer than two beats, or when the beat times do not
/// yield a positive finite tempo.
pub fn bpm_from_beats(beats: &[f64]) -> Option<f64> {
    if beats.len() < 2 {
        return None;
    }

    let deltas: Vec<f64> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let bpm = 60.0 / mean;

    (bpm.is_finite() && bpm > 0.0).then_some(bpm)
}

/// Timestamps of frames where both beat activation and downbeat confidence
/// reach `min_confidence`
pub fn downbeat_times(activations: &Activations, min_confidence: f32, hop_seconds: f64) -> Vec<f64> {
    activations
        .beat
        .iter()
        .zip(activations.downbeat.iter())
        .enumerate()
        .filter(|(_, (&beat, &downbeat))| beat >= min_confidence && downbeat >= min_confidence)
        .map(|(frame, _)| frame as f64 * hop_seconds)
        .collect()
}

/// Whether a detector's frame rate matches the configured hop
pub fn frame_rate_matches(frame_rate: f64, hop_seconds: f64) -> bool {
    let expected = 1.0 / hop_seconds;
    ((frame_rate - expected) / expected).abs() <= 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_from_regular_beats() {
        let beats = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
        let bpm = bpm_from_beats(&beats).unwrap();
        assert!((bpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_uses_mean_interval() {
        // Intervals 0.4 and 0.6 average to 0.5
        let bpm = bpm_from_beats(&[1.0, 1.4, 2.0]).unwrap();
        assert!((bpm - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_needs_two_beats() {
        assert!(bpm_from_beats(&[]).is_none());
        assert!(bpm_from_beats(&[0.7]).is_none());
    }

    #[test]
    fn test_bpm_rejects_non_increasing() {
        assert!(bpm_from_beats(&[1.0, 1.0]).is_none());
        assert!(bpm_from_beats(&[2.0, 1.0]).is_none());
    }

    #[test]
    fn test_bpm_positive_and_finite_for_increasing_sequences() {
        for n in 2..20 {
            let beats: Vec<f64> = (0..n).map(|i| i as f64 * 0.37 + (i * i) as f64 * 0.01).collect();
            let bpm = bpm_from_beats(&beats).unwrap();
            assert!(bpm.is_finite() && bpm > 0.0);
        }
    }

    fn activations(beat: Vec<f32>, downbeat: Vec<f32>) -> Activations {
        Activations {
            frame_rate: 100.0,
            beat,
            downbeat,
        }
    }

    #[test]
    fn test_downbeats_require_both_confidences() {
        let acts = activations(vec![0.9, 0.9, 0.2, 0.8], vec![0.9, 0.1, 0.9, 0.6]);
        let times = downbeat_times(&acts, 0.5, 0.01);
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_downbeats_gate_is_inclusive() {
        let acts = activations(vec![0.5], vec![0.5]);
        assert_eq!(downbeat_times(&acts, 0.5, 0.01), vec![0.0]);
    }

    #[test]
    fn test_downbeats_above_max_confidence_is_empty() {
        let acts = activations(vec![1.0; 50], vec![1.0; 50]);
        assert!(downbeat_times(&acts, 1.1, 0.01).is_empty());
    }

    #[test]
    fn test_downbeats_use_configured_hop() {
        let acts = activations(vec![0.0, 0.0, 1.0], vec![0.0, 0.0, 1.0]);
        let times = downbeat_times(&acts, 0.5, 0.02);
        assert!((times[0] - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_frame_rate_matches() {
        assert!(frame_rate_matches(100.0, 0.01));
        assert!(!frame_rate_matches(50.0, 0.01));
    }
}
