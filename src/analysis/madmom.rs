//! madmom neural beat tracker via python subprocess
//!
//! madmom has no Rust bindings, so the helper script in `scripts/` runs the
//! RNN beat/downbeat processors and prints JSON to stdout:
//!
//! ```json
//! {"fps": 100, "beats": [0.51, 1.02], "beat_activation": [..], "downbeat_activation": [..]}
//! ```
//!
//! A failure inside python is reported as `{"error": "..."}`.

use super::traits::BeatDetector;
use crate::error::{Result, StemshiftError};
use crate::types::Activations;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// JSON written by `scripts/madmom_activations.py`
#[derive(Debug, Deserialize)]
struct MadmomOutput {
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    beats: Vec<f64>,
    #[serde(default)]
    beat_activation: Vec<f32>,
    #[serde(default)]
    downbeat_activation: Vec<f32>,
    #[serde(default)]
    error: Option<String>,
}

/// What the helper script should compute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Beats,
    Activations,
}

impl Mode {
    fn as_arg(self) -> &'static str {
        match self {
            Mode::Beats => "beats",
            Mode::Activations => "activations",
        }
    }
}

/// Beat detector backed by madmom's RNN processors
pub struct MadmomBeatDetector {
    python: PathBuf,
    script: PathBuf,
    /// Frames per second requested from madmom
    fps: f64,
}

impl MadmomBeatDetector {
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>, hop_seconds: f64) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
            fps: 1.0 / hop_seconds,
        }
    }

    fn run(&self, path: &Path, mode: Mode) -> Result<MadmomOutput> {
        info!("Running madmom ({}) on {}", mode.as_arg(), path.display());

        let output = Command::new(&self.python)
            .arg(&self.script)
            .arg(path)
            .arg("--fps")
            .arg(self.fps.to_string())
            .arg("--mode")
            .arg(mode.as_arg())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| StemshiftError::Detection {
                path: path.to_path_buf(),
                reason: format!("Failed to run {}: {}", self.python.display(), e),
            })?;

        debug!("madmom stderr: {}", String::from_utf8_lossy(&output.stderr).trim());

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StemshiftError::Detection {
                path: path.to_path_buf(),
                reason: format!(
                    "madmom script failed with exit code {:?}: {}",
                    output.status.code(),
                    stderr.trim()
                ),
            });
        }

        parse_output(path, &String::from_utf8_lossy(&output.stdout))
    }
}

impl BeatDetector for MadmomBeatDetector {
    fn beats(&self, path: &Path) -> Result<Vec<f64>> {
        let output = self.run(path, Mode::Beats)?;
        debug!("madmom found {} beats", output.beats.len());
        Ok(output.beats)
    }

    fn activations(&self, path: &Path) -> Result<Activations> {
        let output = self.run(path, Mode::Activations)?;
        Ok(Activations {
            frame_rate: output.fps.unwrap_or(self.fps),
            beat: output.beat_activation,
            downbeat: output.downbeat_activation,
        })
    }

    fn name(&self) -> &'static str {
        "madmom"
    }

    fn is_available(&self) -> bool {
        self.script.is_file()
    }
}

/// Parse the helper's stdout, surfacing script-reported errors
fn parse_output(path: &Path, stdout: &str) -> Result<MadmomOutput> {
    let output: MadmomOutput = serde_json::from_str(stdout.trim()).map_err(|e| StemshiftError::Detection {
        path: path.to_path_buf(),
        reason: format!(
            "Failed to parse madmom JSON output ({}): {}",
            e,
            stdout.chars().take(200).collect::<String>()
        ),
    })?;

    if let Some(error) = output.error {
        return Err(StemshiftError::Detection {
            path: path.to_path_buf(),
            reason: error,
        });
    }

    Ok(output)
}
