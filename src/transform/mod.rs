//! Time-stretch and pitch-shift backends
//!
//! Both operations take decoded PCM and return PCM with the same channel
//! layout and rate. The stretch ratio is a tempo factor: 2.0 plays twice as
//! fast, 0.5 half as fast.

pub mod rubberband;
#[cfg(feature = "signalsmith")]
pub mod signalsmith;

use crate::error::{Result, StemshiftError};
use crate::types::PcmBuffer;

pub use rubberband::RubberbandTransform;
#[cfg(feature = "signalsmith")]
pub use signalsmith::SignalsmithTransform;

/// Time/pitch transform backend
pub trait AudioTransform: Send + Sync {
    /// Change tempo by `ratio` without changing pitch
    fn time_stretch(&self, buffer: &PcmBuffer, ratio: f64) -> Result<PcmBuffer>;

    /// Change pitch by `semitones` without changing tempo
    fn pitch_shift(&self, buffer: &PcmBuffer, semitones: f64) -> Result<PcmBuffer>;

    /// Get the name of this transform (for logging)
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this system
    fn is_available(&self) -> bool {
        true
    }
}

/// Reject ratios the transform cannot honor
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(StemshiftError::InvalidRatio(ratio))
    }
}

pub fn validate_semitones(semitones: f64) -> Result<()> {
    if semitones.is_finite() {
        Ok(())
    } else {
        Err(StemshiftError::InvalidRequest(format!(
            "pitch shift must be a finite number of semitones, got {}",
            semitones
        )))
    }
}

/// Make sure the transform kept the input's layout
pub(crate) fn check_layout(input: &PcmBuffer, output: &PcmBuffer, backend: &str) -> Result<()> {
    if input.channels != output.channels || input.sample_rate != output.sample_rate {
        return Err(StemshiftError::Transform {
            reason: format!(
                "{} changed the layout from {}ch @ {}Hz to {}ch @ {}Hz",
                backend, input.channels, input.sample_rate, output.channels, output.sample_rate
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ratio() {
        assert!(validate_ratio(0.8).is_ok());
        assert!(validate_ratio(1.0).is_ok());
        assert!(matches!(validate_ratio(0.0), Err(StemshiftError::InvalidRatio(_))));
        assert!(validate_ratio(-1.5).is_err());
        assert!(validate_ratio(f64::NAN).is_err());
        assert!(validate_ratio(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_semitones() {
        assert!(validate_semitones(-12.0).is_ok());
        assert!(validate_semitones(0.0).is_ok());
        assert!(validate_semitones(f64::NAN).is_err());
    }

    #[test]
    fn test_check_layout() {
        let mono = PcmBuffer::new(vec![0.0; 4], 1, 44100);
        let stereo = PcmBuffer::new(vec![0.0; 4], 2, 44100);
        assert!(check_layout(&mono, &mono, "test").is_ok());
        assert!(check_layout(&mono, &stereo, "test").is_err());
    }
}
