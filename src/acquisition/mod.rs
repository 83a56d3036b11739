//! Media acquisition
//!
//! Turns a source URL into one local audio file named `{video_id}.wav`.
//! The download itself is delegated to yt-dlp.

pub mod ytdlp;

use crate::error::{Result, StemshiftError};
use crate::types::{Track, TrackId};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub use ytdlp::YtDlpSource;

/// Acquisition backend
pub trait MediaSource: Send + Sync {
    /// Download `url` into `output_dir`, returning the raw track
    fn acquire(&self, url: &str, output_dir: &Path) -> Result<Track>;

    /// Get the name of this source (for logging)
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this system
    fn is_available(&self) -> bool {
        true
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"v=([a-zA-Z0-9_-]+)").expect("video id pattern is valid"))
}

/// Extract the video id from the first `v=<id>` in a URL
pub fn extract_video_id(url: &str) -> Result<TrackId> {
    video_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| TrackId::new(m.as_str()))
        .ok_or_else(|| StemshiftError::InvalidUrl {
            url: url.to_string(),
        })
}
