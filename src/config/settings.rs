//! Runtime configuration settings

use super::cli::{Cli, DetectorKind, TransformKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default analysis hop: 100 frames per second
pub const DEFAULT_HOP_SECONDS: f64 = 0.01;

/// Settings consumed by the pipeline orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Root for downloads, derived audio, stems and beat_data.json
    pub output_root: PathBuf,
    /// Stem separation model name
    pub model: String,
    /// Seconds per analysis frame
    pub analysis_hop: f64,
    /// Default downbeat confidence gate
    pub min_confidence: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./resources/tmp"),
            model: "htdemucs_6s".to_string(),
            analysis_hop: DEFAULT_HOP_SECONDS,
            min_confidence: 0.5,
        }
    }
}

/// Helper script shipped in this crate's `scripts/` directory
///
/// Absolute, so the madmom detector works from any working directory.
pub fn bundled_madmom_script() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scripts")
        .join("madmom_activations.py")
}

/// External tools the collaborators shell out to
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ytdlp: PathBuf,
    pub python: PathBuf,
    pub rubberband: PathBuf,
    pub madmom_script: PathBuf,
}

impl ToolPaths {
    /// Resolve tool locations, honoring STEMSHIFT_* environment overrides
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(default))
        };

        Self {
            ytdlp: var("STEMSHIFT_YTDLP", "yt-dlp"),
            python: var("STEMSHIFT_PYTHON", "python3"),
            rubberband: var("STEMSHIFT_RUBBERBAND", "rubberband"),
            madmom_script: std::env::var("STEMSHIFT_MADMOM_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| bundled_madmom_script()),
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ytdlp: PathBuf::from("yt-dlp"),
            python: PathBuf::from("python3"),
            rubberband: PathBuf::from("rubberband"),
            madmom_script: bundled_madmom_script(),
        }
    }
}

/// Runtime settings for a stemshift process
#[derive(Debug, Clone)]
pub struct Settings {
    pub pipeline: PipelineSettings,
    pub tools: ToolPaths,
    /// Beat detection backend
    pub detector: DetectorKind,
    /// Time/pitch transform backend
    pub transform: TransformKind,
    /// TTL of the gateway's per-track cache
    pub cache_ttl: Duration,
    /// Show progress spinner
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &Cli) -> Self {
        let global = &cli.global;
        let cache_ttl = match &cli.command {
            super::cli::Command::Serve(args) => Duration::from_secs(args.cache_ttl),
            super::cli::Command::Run(_) => Settings::default().cache_ttl,
        };

        Self {
            pipeline: PipelineSettings {
                output_root: global.output.clone(),
                model: global.model.clone(),
                analysis_hop: global.hop,
                min_confidence: global.min_confidence,
                ..PipelineSettings::default()
            },
            tools: ToolPaths::from_env(),
            detector: global.detector,
            transform: global.transform,
            cache_ttl,
            show_progress: !global.quiet,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            tools: ToolPaths::default(),
            detector: DetectorKind::Madmom,
            transform: TransformKind::Rubberband,
            cache_ttl: Duration::from_secs(3600),
            show_progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_from_cli_serve() {
        let cli = Cli::try_parse_from([
            "stemshift",
            "--output",
            "/tmp/out",
            "--hop",
            "0.02",
            "serve",
            "--cache-ttl",
            "60",
        ])
        .unwrap();
        let settings = Settings::from_cli(&cli);
        assert_eq!(settings.pipeline.output_root, PathBuf::from("/tmp/out"));
        assert!((settings.pipeline.analysis_hop - 0.02).abs() < 1e-12);
        assert_eq!(settings.cache_ttl, Duration::from_secs(60));
        assert!(settings.show_progress);
    }

    #[test]
    fn test_default_madmom_script_is_absolute() {
        let script = ToolPaths::default().madmom_script;
        assert!(script.is_absolute());
        assert!(script.is_file(), "missing {}", script.display());
    }

    #[test]
    fn test_default_pipeline_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.model, "htdemucs_6s");
        assert!((settings.analysis_hop - DEFAULT_HOP_SECONDS).abs() < 1e-12);
    }
}
