//! yt-dlp integration for downloading source audio

use super::{extract_video_id, MediaSource};
use crate::error::{Result, StemshiftError};
use crate::types::Track;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Downloads the best audio stream and extracts it to WAV via ffmpeg
pub struct YtDlpSource {
    binary: PathBuf,
}

impl YtDlpSource {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn output_template(output_dir: &Path) -> String {
        output_dir.join("%(id)s.%(ext)s").to_string_lossy().to_string()
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl MediaSource for YtDlpSource {
    fn acquire(&self, url: &str, output_dir: &Path) -> Result<Track> {
        // Fail on a bad URL before spawning anything
        let id = extract_video_id(url)?;

        std::fs::create_dir_all(output_dir)
            .map_err(|e| StemshiftError::output_error(output_dir, e))?;

        info!("Downloading {} ({})", url, id);

        let output = Command::new(&self.binary)
            .args(["-f", "wav/bestaudio/best", "-x", "--audio-format", "wav", "--no-warnings"])
            .arg("-o")
            .arg(Self::output_template(output_dir))
            .arg(url)
            .output()
            .map_err(|e| StemshiftError::Acquisition {
                url: url.to_string(),
                reason: format!("Failed to run {}: {}", self.binary.display(), e),
            })?;

        debug!("yt-dlp stdout: {}", String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StemshiftError::Acquisition {
                url: url.to_string(),
                reason: format!("yt-dlp exited with {}: {}", output.status, stderr.trim()),
            });
        }

        let path = output_dir.join(format!("{}.wav", id));
        if !path.exists() {
            return Err(StemshiftError::Acquisition {
                url: url.to_string(),
                reason: format!("yt-dlp finished but {} was not produced", path.display()),
            });
        }

        info!("Downloaded {}", path.display());

        Ok(Track::with_id(id, path))
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
