//! Unified error types for stemshift
//!
//! Error strategy:
//! - Every stage failure aborts the pipeline invocation and is surfaced to the caller
//! - Nothing is retried; re-running a stage overwrites its own output deterministically
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Formats the decoder accepts, for helpful error messages
pub const SUPPORTED_FORMATS: &str = "WAV, MP3, FLAC, AAC/M4A";

/// Top-level error type for stemshift operations
#[derive(Debug, Error)]
pub enum StemshiftError {
    // =========================================================================
    // Acquisition errors
    // =========================================================================
    #[error("No video id found in '{url}'\n  Tip: Expected a URL containing 'v=<id>', e.g. https://youtube.com/watch?v=Br3KkvgMAZY")]
    InvalidUrl { url: String },

    #[error("Failed to acquire audio from '{url}': {reason}\n  Tip: Check that yt-dlp and ffmpeg are installed (set STEMSHIFT_YTDLP to override the binary)")]
    Acquisition { url: String, reason: String },

    // =========================================================================
    // Decode / analysis errors
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    Decode { path: PathBuf, reason: String },

    #[error("Only {found} beat(s) detected in '{path}', at least 2 are needed to measure tempo\n  Tip: The track may be too short or lack a clear pulse")]
    InsufficientBeats { path: PathBuf, found: usize },

    #[error("Beat detection failed for '{path}': {reason}")]
    Detection { path: PathBuf, reason: String },

    // =========================================================================
    // Request validation
    // =========================================================================
    #[error("Invalid stretch ratio {0}: the ratio must be a finite number greater than 0")]
    InvalidRatio(f64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // Collaborator failures
    // =========================================================================
    #[error("Time/pitch transform failed: {reason}\n  Tip: Check that rubberband is installed (set STEMSHIFT_RUBBERBAND to override the binary)")]
    Transform { reason: String },

    #[error("Stem separation failed for '{path}': {reason}\n  Tip: Check that demucs is installed: python3 -m pip install demucs")]
    Separation { path: PathBuf, reason: String },

    // =========================================================================
    // Beat data sidecar
    // =========================================================================
    #[error("Beat data file not found: '{0}'\n  Tip: The output directory has not been initialized yet")]
    MissingSidecar(PathBuf),

    #[error("Beat data file '{path}' is not valid: {reason}\n  Tip: Delete it and re-run initialization")]
    CorruptSidecar { path: PathBuf, reason: String },

    // =========================================================================
    // System errors
    // =========================================================================
    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    Output { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemshift operations
pub type Result<T> = std::result::Result<T, StemshiftError>;

impl StemshiftError {
    /// Returns true if the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StemshiftError::InvalidUrl { .. }
                | StemshiftError::InvalidRatio(_)
                | StemshiftError::InvalidRequest(_)
                | StemshiftError::InsufficientBeats { .. }
        )
    }

    /// Returns true for the acquisition family (bad URL, download failure)
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            StemshiftError::InvalidUrl { .. } | StemshiftError::Acquisition { .. }
        )
    }

    /// Returns true if the error means a requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StemshiftError::MissingSidecar(_) => true,
            StemshiftError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StemshiftError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        StemshiftError::Output { path, reason }
    }
}
