//! CLI argument parsing and configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// stemshift - Retime, repitch and split songs into stems
///
/// Downloads a song, detects its beats and tempo, optionally stretches it to a
/// target tempo or shifts its pitch, and separates it into instrument stems.
#[derive(Parser, Debug)]
#[command(name = "stemshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output root for downloads, derived audio, stems and beat_data.json
    #[arg(short, long, value_name = "DIR", default_value = "./resources/tmp", global = true)]
    pub output: PathBuf,

    /// Stem separation model (4-stem "htdemucs" or 6-stem "htdemucs_6s")
    #[arg(long, value_name = "NAME", default_value = "htdemucs_6s", global = true)]
    pub model: String,

    /// Beat detection backend
    #[arg(long, value_enum, default_value_t = DetectorKind::Madmom, global = true)]
    pub detector: DetectorKind,

    /// Time/pitch transform backend
    #[arg(long, value_enum, default_value_t = TransformKind::Rubberband, global = true)]
    pub transform: TransformKind,

    /// Analysis hop in seconds (must match the detector's frame rate)
    #[arg(long, value_name = "SECONDS", default_value_t = 0.01, global = true)]
    pub hop: f64,

    /// Minimum beat and downbeat confidence for a frame to count as a downbeat
    #[arg(long, value_name = "F", default_value_t = 0.5, global = true)]
    pub min_confidence: f32,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress spinner)
    #[arg(short, long, default_value = "false", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Process a single URL from the command line
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// How long per-track beat results stay cached, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 3600)]
    pub cache_ttl: u64,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source URL (must contain v=<id>)
    #[arg(short, long, value_name = "URL")]
    pub url: String,

    /// Stretch to this tempo (measured against the detected tempo)
    #[arg(long, value_name = "BPM", conflicts_with = "ratio")]
    pub target_bpm: Option<f64>,

    /// Explicit tempo factor (> 1 is faster)
    #[arg(long, value_name = "F")]
    pub ratio: Option<f64>,

    /// Pitch shift in semitones, applied after any tempo change
    #[arg(long, value_name = "SEMITONES", allow_hyphen_values = true)]
    pub pitch: Option<f64>,

    /// Separate the final track into stems
    #[arg(long, default_value = "false")]
    pub stems: bool,

    /// Detect downbeats on the final track and store them in beat_data.json
    #[arg(long, default_value = "false")]
    pub downbeats: bool,
}

/// Beat detection backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorKind {
    /// In-process stratum-dsp beat tracker
    Stratum,
    /// madmom neural beat tracker (python subprocess)
    Madmom,
}

/// Time/pitch transform backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// rubberband command-line tool
    Rubberband,
    /// In-process signalsmith stretch (requires the `signalsmith` feature)
    Signalsmith,
}

impl GlobalArgs {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["stemshift", "serve"]).unwrap();
        assert_eq!(cli.global.model, "htdemucs_6s");
        assert_eq!(cli.global.detector, DetectorKind::Madmom);
        assert!((cli.global.hop - 0.01).abs() < 1e-12);
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.listen.port(), 8000);
                assert_eq!(args.cache_ttl, 3600);
            }
            Command::Run(_) => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_run_with_negative_pitch() {
        let cli = Cli::try_parse_from([
            "stemshift",
            "--detector",
            "stratum",
            "run",
            "--url",
            "https://youtube.com/watch?v=abc",
            "--ratio",
            "0.8",
            "--pitch",
            "-2",
        ])
        .unwrap();
        assert_eq!(cli.global.detector, DetectorKind::Stratum);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.ratio, Some(0.8));
                assert_eq!(args.pitch, Some(-2.0));
                assert!(args.target_bpm.is_none());
            }
            Command::Serve(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_target_bpm_conflicts_with_ratio() {
        let result = Cli::try_parse_from([
            "stemshift",
            "run",
            "--url",
            "https://youtube.com/watch?v=abc",
            "--ratio",
            "0.8",
            "--target-bpm",
            "120",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let mut cli = Cli::try_parse_from(["stemshift", "-vv", "serve"]).unwrap();
        assert_eq!(cli.global.log_level(), tracing::Level::DEBUG);
        cli.global.quiet = true;
        assert_eq!(cli.global.log_level(), tracing::Level::ERROR);
    }
}
