//! WAV output using hound
//!
//! Artifacts are written as 16-bit integer PCM. The write goes to a uniquely
//! named temp file in the same directory first and is then renamed over the
//! target, so concurrent writers of one path never share a file.

use crate::error::{Result, StemshiftError};
use crate::types::PcmBuffer;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Write a buffer to a WAV file, replacing any existing file
pub fn write_wav(path: &Path, buffer: &PcmBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Dropped without persisting, the temp file removes itself
    let mut temp = tempfile::Builder::new()
        .prefix(".stemshift-")
        .suffix(".wav.tmp")
        .tempfile_in(dir)
        .map_err(|e| StemshiftError::output_error(path, e))?;

    write_samples(BufWriter::new(temp.as_file_mut()), spec, &buffer.samples).map_err(|e| {
        StemshiftError::Output {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    temp.persist(path).map_err(|e| StemshiftError::Output {
        path: path.to_path_buf(),
        reason: format!("Failed to finalize file: {}", e.error),
    })?;

    debug!(
        "Wrote {} frames ({}ch @ {}Hz) to {}",
        buffer.frames(),
        buffer.channels,
        buffer.sample_rate,
        path.display()
    );

    Ok(())
}

fn write_samples<W>(writer: W, spec: hound::WavSpec, samples: &[f32]) -> hound::Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let mut writer = hound::WavWriter::new(writer, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}
