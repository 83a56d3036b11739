//! Explicit stage plan for song modification
//!
//! Each stage consumes the track produced by the stage before it, so the
//! order of this list is the order of processing.

use crate::types::ModifyRequest;

/// How the tempo of a track should change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempoChange {
    /// Resolve a ratio against the measured tempo
    TargetBpm(f64),
    /// Apply this tempo factor directly
    Ratio(f64),
}

/// One processing step of `modify_song`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    TimeStretch(TempoChange),
    PitchShift { semitones: f64 },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::TimeStretch(_) => "time-stretch",
            Stage::PitchShift { .. } => "pitch-shift",
        }
    }
}

/// Turn a request into its ordered stages
///
/// A target tempo wins over an explicit ratio; only one tempo change is ever
/// planned. Pitch shifting always comes last.
pub fn plan(request: &ModifyRequest) -> Vec<Stage> {
    let mut stages = Vec::with_capacity(2);

    let tempo = match (request.target_bpm, request.stretch_ratio) {
        (Some(bpm), _) => Some(TempoChange::TargetBpm(bpm)),
        (None, Some(ratio)) => Some(TempoChange::Ratio(ratio)),
        (None, None) => None,
    };
    if let Some(change) = tempo {
        stages.push(Stage::TimeStretch(change));
    }

    if let Some(semitones) = request.pitch_shift_semitones {
        stages.push(Stage::PitchShift { semitones });
    }

    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_plans_nothing() {
        assert!(plan(&ModifyRequest::default()).is_empty());
    }

    #[test]
    fn test_target_bpm_wins_over_ratio() {
        let request = ModifyRequest {
            target_bpm: Some(128.0),
            stretch_ratio: Some(0.5),
            pitch_shift_semitones: None,
        };
        assert_eq!(plan(&request), vec![Stage::TimeStretch(TempoChange::TargetBpm(128.0))]);
    }

    #[test]
    fn test_pitch_runs_after_stretch() {
        let request = ModifyRequest {
            target_bpm: None,
            stretch_ratio: Some(1.25),
            pitch_shift_semitones: Some(-3.0),
        };
        let stages = plan(&request);
        assert_eq!(
            stages,
            vec![
                Stage::TimeStretch(TempoChange::Ratio(1.25)),
                Stage::PitchShift { semitones: -3.0 },
            ]
        );
    }

    #[test]
    fn test_pitch_only() {
        let request = ModifyRequest {
            pitch_shift_semitones: Some(2.0),
            ..ModifyRequest::default()
        };
        let stages = plan(&request);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name(), "pitch-shift");
    }
}
