//! rubberband command-line integration
//!
//! Samples go through a temporary WAV file: rubberband reads the input file,
//! writes the output file, and the result is decoded back.

use super::{check_layout, validate_ratio, validate_semitones, AudioTransform};
use crate::audio;
use crate::error::{Result, StemshiftError};
use crate::types::PcmBuffer;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Phase-vocoder transform via the `rubberband` binary
pub struct RubberbandTransform {
    binary: PathBuf,
}

impl RubberbandTransform {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, buffer: &PcmBuffer, args: &[OsString]) -> Result<PcmBuffer> {
        let work_dir = tempfile::Builder::new()
            .prefix("stemshift_rb_")
            .tempdir()
            .map_err(|e| StemshiftError::Transform {
                reason: format!("Failed to create temporary directory: {}", e),
            })?;

        let input = work_dir.path().join("input.wav");
        let output = work_dir.path().join("output.wav");
        audio::write_wav(&input, buffer)?;

        debug!("Running {} {:?}", self.binary.display(), args);

        let result = Command::new(&self.binary)
            .args(args)
            .arg(&input)
            .arg(&output)
            .output()
            .map_err(|e| StemshiftError::Transform {
                reason: format!("Failed to run {}: {}", self.binary.display(), e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(StemshiftError::Transform {
                reason: format!("rubberband exited with {}: {}", result.status, stderr.trim()),
            });
        }

        let transformed = audio::decode(&output)?;
        check_layout(buffer, &transformed, self.name())?;

        // work_dir is removed when dropped
        Ok(transformed)
    }
}

impl Default for RubberbandTransform {
    fn default() -> Self {
        Self::new("rubberband")
    }
}

impl AudioTransform for RubberbandTransform {
    fn time_stretch(&self, buffer: &PcmBuffer, ratio: f64) -> Result<PcmBuffer> {
        validate_ratio(ratio)?;
        self.run(buffer, &["--tempo".into(), ratio.to_string().into()])
    }

    fn pitch_shift(&self, buffer: &PcmBuffer, semitones: f64) -> Result<PcmBuffer> {
        validate_semitones(semitones)?;
        self.run(buffer, &["--pitch".into(), semitones.to_string().into()])
    }

    fn name(&self) -> &'static str {
        "rubberband"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
