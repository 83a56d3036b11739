//! demucs separation via python subprocess

use super::{discover_stems, StemSeparator};
use crate::error::{Result, StemshiftError};
use crate::types::StemFile;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// How much of demucs' stderr to keep in error messages
const STDERR_TAIL_CHARS: usize = 500;

/// Runs `python -m demucs.separate` and discovers its output
pub struct DemucsSeparator {
    python: PathBuf,
}

impl DemucsSeparator {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl Default for DemucsSeparator {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl StemSeparator for DemucsSeparator {
    fn separate(&self, input: &Path, model: &str, output_root: &Path) -> Result<Vec<StemFile>> {
        info!("Separating {} with {}", input.display(), model);

        let output = Command::new(&self.python)
            .args(["-m", "demucs.separate", "-o"])
            .arg(output_root)
            .arg("-n")
            .arg(model)
            .arg(input)
            .output()
            .map_err(|e| StemshiftError::Separation {
                path: input.to_path_buf(),
                reason: format!("Failed to run {}: {}", self.python.display(), e),
            })?;

        debug!("demucs stdout: {}", String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            return Err(StemshiftError::Separation {
                path: input.to_path_buf(),
                reason: format!(
                    "demucs exited with {}: {}",
                    output.status,
                    stderr_tail(&String::from_utf8_lossy(&output.stderr))
                ),
            });
        }

        discover_stems(output_root, model, input)
    }

    fn name(&self) -> &'static str {
        "demucs"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.python)
            .args(["-c", "import demucs"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Last few hundred characters of a subprocess' stderr
fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_TAIL_CHARS).collect();
    format!("...{}", tail)
}
