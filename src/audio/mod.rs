//! Audio I/O: decoding with symphonia, WAV output with hound

pub mod decoder;
pub mod writer;

pub use decoder::decode;
pub use writer::write_wav;

use std::path::{Path, PathBuf};

/// Path of an artifact derived from `input`: `{output_dir}/{file_stem}{suffix}.wav`
pub fn derived_path(input: &Path, output_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    output_dir.join(format!("{}{}.wav", stem, suffix))
}
