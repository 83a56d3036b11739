//! In-process transform using signalsmith-stretch

use super::{validate_ratio, validate_semitones, AudioTransform};
use crate::error::Result;
use crate::types::PcmBuffer;
use signalsmith_stretch::Stretch;
use tracing::debug;

/// signalsmith-stretch with its default preset
#[derive(Default)]
pub struct SignalsmithTransform;

impl SignalsmithTransform {
    pub fn new() -> Self {
        Self
    }

    fn process(&self, buffer: &PcmBuffer, ratio: f64, semitones: f64) -> PcmBuffer {
        let channels = buffer.channels as usize;
        let output_frames = (buffer.frames() as f64 / ratio).round() as usize;
        let mut output = vec![0.0f32; output_frames * channels];

        let mut stretch = Stretch::preset_default(buffer.channels as u32, buffer.sample_rate);
        stretch.set_transpose_factor_semitones(semitones as f32, None);
        stretch.exact(&buffer.samples, &mut output);

        debug!(
            "signalsmith: {} -> {} frames (ratio {:.3}, {:+.2} st)",
            buffer.frames(),
            output_frames,
            ratio,
            semitones
        );

        PcmBuffer::new(output, buffer.channels, buffer.sample_rate)
    }
}

impl AudioTransform for SignalsmithTransform {
    fn time_stretch(&self, buffer: &PcmBuffer, ratio: f64) -> Result<PcmBuffer> {
        validate_ratio(ratio)?;
        Ok(self.process(buffer, ratio, 0.0))
    }

    fn pitch_shift(&self, buffer: &PcmBuffer, semitones: f64) -> Result<PcmBuffer> {
        validate_semitones(semitones)?;
        Ok(self.process(buffer, 1.0, semitones))
    }

    fn name(&self) -> &'static str {
        "signalsmith"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_changes_length_keeps_layout() {
        let buffer = PcmBuffer::new(vec![0.1; 44100 * 2], 2, 44100);
        let out = SignalsmithTransform::new().time_stretch(&buffer, 2.0).unwrap();
        assert_eq!(out.channels, 2);
        assert_eq!(out.sample_rate, 44100);
        assert_eq!(out.frames(), 22050);
    }

    #[test]
    fn test_pitch_shift_keeps_length() {
        let buffer = PcmBuffer::new(vec![0.1; 44100], 1, 44100);
        let out = SignalsmithTransform::new().pitch_shift(&buffer, 3.0).unwrap();
        assert_eq!(out.frames(), 44100);
    }
}
