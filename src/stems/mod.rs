//! Stem separation
//!
//! A separator writes one WAV per stem under
//! `{output_root}/{model}/{track_stem}/{stem}.wav`. The stem vocabulary
//! depends on the model and is discovered from disk, never enumerated.

pub mod demucs;

use crate::error::{Result, StemshiftError};
use crate::types::StemFile;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub use demucs::DemucsSeparator;

/// Separation backend
pub trait StemSeparator: Send + Sync {
    /// Separate `input` with `model`, returning the stems written under `output_root`
    fn separate(&self, input: &Path, model: &str, output_root: &Path) -> Result<Vec<StemFile>>;

    /// Get the name of this separator (for logging)
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this system
    fn is_available(&self) -> bool {
        true
    }
}

/// Directory the separator writes `input`'s stems to
pub fn stem_dir(output_root: &Path, model: &str, input: &Path) -> PathBuf {
    let base = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "track".to_string());
    output_root.join(model).join(base)
}

/// List the `.wav` files a separator produced for `input`, sorted by path
pub fn discover_stems(output_root: &Path, model: &str, input: &Path) -> Result<Vec<StemFile>> {
    let dir = stem_dir(output_root, model, input);
    if !dir.is_dir() {
        return Err(StemshiftError::Separation {
            path: input.to_path_buf(),
            reason: format!("expected stem directory {} was not created", dir.display()),
        });
    }

    let mut stems: Vec<StemFile> = WalkDir::new(&dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .map(|e| {
            debug!("Discovered stem: {}", e.path().display());
            StemFile::from_path(e.path())
        })
        .collect();

    stems.sort_by(|a, b| a.path.cmp(&b.path));
    info!("Found {} stems in {}", stems.len(), dir.display());

    Ok(stems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_stem_dir_layout() {
        let dir = stem_dir(Path::new("/out"), "htdemucs", Path::new("/out/abc_stretched.wav"));
        assert_eq!(dir, PathBuf::from("/out/htdemucs/abc_stretched"));
    }

    #[test]
    fn test_discover_sorted_wavs_only() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("htdemucs_6s").join("song");
        fs::create_dir_all(&dir).unwrap();
        for name in ["vocals.wav", "bass.wav", "drums.WAV", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let stems = discover_stems(root.path(), "htdemucs_6s", Path::new("song.wav")).unwrap();
        let names: Vec<_> = stems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["bass", "drums", "vocals"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let root = TempDir::new().unwrap();
        let err = discover_stems(root.path(), "htdemucs", Path::new("song.wav")).unwrap_err();
        assert!(matches!(err, StemshiftError::Separation { .. }));
    }
}
