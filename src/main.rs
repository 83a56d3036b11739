//! stemshift CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::time::Duration;
use stemshift::config::{Cli, Command, GlobalArgs, RunArgs, ServeArgs, Settings};
use stemshift::pipeline::Orchestrator;
use stemshift::server::{self, AppState};
use stemshift::types::ModifyRequest;
use stemshift::Result;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.global);

    // Build settings from CLI
    let settings = Settings::from_cli(&cli);

    // Validate inputs
    if let Err(e) = validate_inputs(&cli.global) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Command::Serve(args) => serve(&settings, args),
        Command::Run(args) => run_job(&settings, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(global: &GlobalArgs) {
    let filter = global.log_level().to_string().to_lowercase();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

fn validate_inputs(global: &GlobalArgs) -> std::result::Result<(), String> {
    // Check output parent directory exists (we'll create the output dir itself)
    if let Some(parent) = global.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(format!(
                "Output parent directory does not exist: {}\n\n  Tip: The output directory will be created automatically,\n  but its parent directory must exist.\n  Example: mkdir -p {}",
                parent.display(),
                parent.display()
            ));
        }
    }

    if !(global.hop > 0.0 && global.hop <= 1.0) {
        return Err(format!(
            "Analysis hop must be in (0, 1] seconds, got {}\n\n  Tip: madmom produces 100 frames per second, i.e. --hop 0.01",
            global.hop
        ));
    }

    if !global.min_confidence.is_finite() {
        return Err(format!(
            "Minimum confidence must be a finite number, got {}",
            global.min_confidence
        ));
    }

    Ok(())
}

fn serve(settings: &Settings, args: &ServeArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_settings(settings)?;
    orchestrator.prepare()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(server::run_server(
        args.listen,
        AppState::new(orchestrator, settings.cache_ttl),
    ))
}

fn run_job(settings: &Settings, args: &RunArgs) -> Result<()> {
    let orchestrator = Orchestrator::from_settings(settings)?;
    orchestrator.prepare()?;

    let spinner = create_spinner(settings.show_progress);
    let step = |msg: &str| {
        if let Some(ref pb) = spinner {
            pb.set_message(msg.to_string());
        }
    };

    step("Downloading");
    let source = orchestrator.acquire(&args.url)?;

    step("Modifying");
    let request = ModifyRequest {
        target_bpm: args.target_bpm,
        stretch_ratio: args.ratio,
        pitch_shift_semitones: args.pitch,
    };
    let working = source.derive(orchestrator.modify_song(&source, &request)?);

    let downbeats = if args.downbeats {
        step("Detecting downbeats");
        Some(orchestrator.detect_downbeats(&working, settings.pipeline.min_confidence)?)
    } else {
        None
    };

    let stems = if args.stems {
        step("Separating stems");
        orchestrator.separate_stems(&working, &settings.pipeline.model, orchestrator.output_root())?
    } else {
        Vec::new()
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    println!("Source: {}", source.path.display());
    if working.path != source.path {
        println!("Output: {}", working.path.display());
    }
    if let Some(downbeats) = downbeats {
        println!("Downbeats: {}", downbeats.len());
    }
    for stem in &stems {
        println!("Stem {}: {}", stem.name, stem.path.display());
    }

    Ok(())
}

fn create_spinner(show: bool) -> Option<ProgressBar> {
    if !show {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}
