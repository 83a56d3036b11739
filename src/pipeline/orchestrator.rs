//! Pipeline orchestration
//!
//! Sequences acquisition, time/pitch transforms, beat detection and stem
//! separation for one track. Every call blocks until its stages complete and
//! any stage failure aborts the whole call.

use super::stages::{self, Stage, TempoChange};
use crate::acquisition::{MediaSource, YtDlpSource};
use crate::analysis::tempo;
use crate::analysis::{BeatDetector, MadmomBeatDetector, StratumBeatDetector};
use crate::audio;
use crate::config::{DetectorKind, PipelineSettings, Settings, ToolPaths, TransformKind};
use crate::error::{Result, StemshiftError};
use crate::stems::{DemucsSeparator, StemSeparator};
use crate::store::BeatStore;
use crate::transform::{self, AudioTransform, RubberbandTransform};
use crate::types::{
    Artifact, ArtifactKind, BeatAnalysis, ModifyRequest, PcmBuffer, StemFile, Track, TrackId,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything produced by one URL job
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub track_id: TrackId,
    /// Raw downloaded file
    pub source: PathBuf,
    /// Time-stretched artifact the later stages ran on
    pub stretched: PathBuf,
    pub downbeats: Vec<f64>,
    pub stems: Vec<StemFile>,
}

impl JobOutcome {
    /// Every file the job produced or consumed, tagged by kind
    pub fn artifacts(&self) -> Vec<Artifact> {
        let mut artifacts = vec![
            Artifact::new(&self.source, ArtifactKind::Raw),
            Artifact::new(&self.stretched, ArtifactKind::Stretched),
        ];
        artifacts.extend(
            self.stems
                .iter()
                .map(|stem| Artifact::new(&stem.path, ArtifactKind::Stem(stem.name.clone()))),
        );
        artifacts
    }

    /// Per-track record for the gateway cache
    ///
    /// `bpm` is `None`: the URL job does not measure tempo.
    pub fn analysis(&self) -> BeatAnalysis {
        BeatAnalysis {
            beats: self.downbeats.clone(),
            bpm: None,
        }
    }
}

/// Drives the collaborators for one output directory
pub struct Orchestrator {
    settings: PipelineSettings,
    source: Arc<dyn MediaSource>,
    detector: Arc<dyn BeatDetector>,
    transform: Arc<dyn AudioTransform>,
    separator: Arc<dyn StemSeparator>,
    store: BeatStore,
}

impl Orchestrator {
    pub fn new(
        settings: PipelineSettings,
        source: Arc<dyn MediaSource>,
        detector: Arc<dyn BeatDetector>,
        transform: Arc<dyn AudioTransform>,
        separator: Arc<dyn StemSeparator>,
    ) -> Self {
        let store = BeatStore::open(&settings.output_root);
        Self {
            settings,
            source,
            detector,
            transform,
            separator,
            store,
        }
    }

    /// Build the configured collaborators
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let tools = &settings.tools;
        let pipeline = &settings.pipeline;

        let detector: Arc<dyn BeatDetector> = match settings.detector {
            DetectorKind::Stratum => Arc::new(StratumBeatDetector::new(pipeline.analysis_hop)),
            DetectorKind::Madmom => Arc::new(MadmomBeatDetector::new(
                tools.python.clone(),
                tools.madmom_script.clone(),
                pipeline.analysis_hop,
            )),
        };

        Ok(Self::new(
            pipeline.clone(),
            Arc::new(YtDlpSource::new(tools.ytdlp.clone())),
            detector,
            build_transform(settings.transform, tools)?,
            Arc::new(DemucsSeparator::new(tools.python.clone())),
        ))
    }

    pub fn with_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn BeatDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn AudioTransform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_separator(mut self, separator: Arc<dyn StemSeparator>) -> Self {
        self.separator = separator;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn output_root(&self) -> &Path {
        &self.settings.output_root
    }

    pub fn store(&self) -> &BeatStore {
        &self.store
    }

    /// Create the output directory and its beat data record if absent
    ///
    /// Backends whose tools cannot be found are reported, not rejected: only
    /// the operations that need them will fail.
    pub fn prepare(&self) -> Result<()> {
        info!(
            "Using {} / {} / {} / {}",
            self.source.name(),
            self.detector.name(),
            self.transform.name(),
            self.separator.name()
        );

        let missing = self.unavailable_backends();
        for name in &missing {
            warn!("{} is not available; operations that need it will fail", name);
        }

        self.store.initialize()?;
        Ok(())
    }

    /// Names of the configured backends that cannot run on this system
    pub fn unavailable_backends(&self) -> Vec<&'static str> {
        let checks = [
            (self.source.name(), self.source.is_available()),
            (self.detector.name(), self.detector.is_available()),
            (self.transform.name(), self.transform.is_available()),
            (self.separator.name(), self.separator.is_available()),
        ];
        checks
            .into_iter()
            .filter_map(|(name, available)| (!available).then_some(name))
            .collect()
    }

    /// Download `url` into the output root
    pub fn acquire(&self, url: &str) -> Result<Track> {
        info!("Acquiring {} via {}", url, self.source.name());
        let track = self.source.acquire(url, self.output_root())?;
        debug!("Acquired {}", track.path.display());
        Ok(track)
    }

    /// Ratio that takes `track` from its measured tempo to `target_bpm`
    ///
    /// The measured tempo is persisted to the beat data record.
    pub fn resolve_stretch_ratio(&self, track: &Track, target_bpm: f64) -> Result<f64> {
        validate_target_bpm(target_bpm)?;

        let beats = self.detector.beats(&track.path)?;
        let measured = measured_bpm(&track.path, &beats)?;
        self.store.set_bpm(track.id.as_ref(), measured)?;

        let ratio = target_bpm / measured;
        info!(
            "{}: measured {:.2} BPM, target {:.2} BPM, ratio {:.4}",
            track.base_name(),
            measured,
            target_bpm,
            ratio
        );
        Ok(ratio)
    }

    /// Time-stretch `track` by `ratio` into `{base}_stretched.wav`
    pub fn apply_time_stretch(&self, track: &Track, ratio: f64) -> Result<Track> {
        transform::validate_ratio(ratio)?;
        info!("Stretching {} by {:.4}", track.base_name(), ratio);

        let buffer = audio::decode(&track.path)?;
        let stretched = self.transform.time_stretch(&buffer, ratio)?;
        self.write_artifact(track, &stretched, ArtifactKind::Stretched)
    }

    /// Pitch-shift `track` by `semitones` into `{base}_final.wav`
    pub fn apply_pitch_shift(&self, track: &Track, semitones: f64) -> Result<Track> {
        transform::validate_semitones(semitones)?;
        info!("Shifting {} by {:+.2} semitones", track.base_name(), semitones);

        let buffer = audio::decode(&track.path)?;
        let shifted = self.transform.pitch_shift(&buffer, semitones)?;
        self.write_artifact(track, &shifted, ArtifactKind::PitchShifted)
    }

    /// Run `stages` in order, each on the previous stage's output
    pub fn run_stages(&self, track: &Track, stages: &[Stage]) -> Result<Track> {
        let mut current = track.clone();

        for stage in stages {
            debug!("Stage {} on {}", stage.name(), current.path.display());
            current = match *stage {
                Stage::TimeStretch(TempoChange::TargetBpm(bpm)) => {
                    let ratio = self.resolve_stretch_ratio(&current, bpm)?;
                    self.apply_time_stretch(&current, ratio)?
                }
                Stage::TimeStretch(TempoChange::Ratio(ratio)) => self.apply_time_stretch(&current, ratio)?,
                Stage::PitchShift { semitones } => self.apply_pitch_shift(&current, semitones)?,
            };
        }

        Ok(current)
    }

    /// Apply the requested tempo and pitch changes, returning the final path
    ///
    /// An empty request returns the input path and writes nothing.
    pub fn modify_song(&self, track: &Track, request: &ModifyRequest) -> Result<PathBuf> {
        if request.is_noop() {
            debug!("Nothing to modify for {}", track.base_name());
            return Ok(track.path.clone());
        }

        validate_request(request)?;
        let stages = stages::plan(request);
        Ok(self.run_stages(track, &stages)?.path)
    }

    /// Detect beats and tempo, persisting both to the beat data record
    pub fn detect_beats(&self, track: &Track) -> Result<BeatAnalysis> {
        info!("Detecting beats in {} ({})", track.base_name(), self.detector.name());

        let beats = self.detector.beats(&track.path)?;
        let bpm = tempo::bpm_from_beats(&beats);
        let owner = track.id.clone();

        self.store.update(|data| {
            data.beats = beats.clone();
            if let Some(bpm) = bpm {
                data.bpm = bpm;
            }
            data.track_id = owner;
        })?;

        match bpm {
            Some(bpm) => info!("{}: {} beats, {:.2} BPM", track.base_name(), beats.len(), bpm),
            None => info!("{}: {} beats, tempo undefined", track.base_name(), beats.len()),
        }

        Ok(BeatAnalysis { beats, bpm })
    }

    /// Detect downbeats gated on `min_confidence`, persisting them as `beats`
    pub fn detect_downbeats(&self, track: &Track, min_confidence: f32) -> Result<Vec<f64>> {
        if !min_confidence.is_finite() {
            return Err(StemshiftError::InvalidRequest(format!(
                "min_confidence must be finite, got {}",
                min_confidence
            )));
        }

        info!("Detecting downbeats in {} ({})", track.base_name(), self.detector.name());

        let hop = self.settings.analysis_hop;
        let activations = self.detector.activations(&track.path)?;
        if !tempo::frame_rate_matches(activations.frame_rate, hop) {
            return Err(StemshiftError::Config(format!(
                "{} produced {} frames/s but the analysis hop of {}s expects {} frames/s\n  Tip: Adjust --hop to match the detector",
                self.detector.name(),
                activations.frame_rate,
                hop,
                1.0 / hop
            )));
        }

        let downbeats = tempo::downbeat_times(&activations, min_confidence, hop);
        self.store.set_beats(track.id.as_ref(), &downbeats)?;

        info!(
            "{}: {} downbeats at confidence >= {:.2}",
            track.base_name(),
            downbeats.len(),
            min_confidence
        );
        Ok(downbeats)
    }

    /// Separate `track` into stems under `{output_root}/{model}/{base}/`
    pub fn separate_stems(&self, track: &Track, model: &str, output_root: &Path) -> Result<Vec<StemFile>> {
        std::fs::create_dir_all(output_root).map_err(|e| StemshiftError::output_error(output_root, e))?;
        info!("Separating {} with {} ({})", track.base_name(), model, self.separator.name());

        let stems = self.separator.separate(&track.path, model, output_root)?;
        info!("{}: {} stems", track.base_name(), stems.len());
        Ok(stems)
    }

    /// Download, stretch, detect downbeats and separate the stretched track
    pub fn process_url(&self, url: &str, ratio: f64) -> Result<JobOutcome> {
        transform::validate_ratio(ratio)?;

        let source = self.acquire(url)?;
        let stretched = self.apply_time_stretch(&source, ratio)?;
        let downbeats = self.detect_downbeats(&stretched, self.settings.min_confidence)?;
        let stems = self.separate_stems(&stretched, &self.settings.model, self.output_root())?;

        let track_id = source
            .id
            .clone()
            .unwrap_or_else(|| TrackId::new(source.base_name()));

        Ok(JobOutcome {
            track_id,
            source: source.path,
            stretched: stretched.path,
            downbeats,
            stems,
        })
    }

    fn write_artifact(&self, input: &Track, buffer: &PcmBuffer, kind: ArtifactKind) -> Result<Track> {
        let output_root = self.output_root();
        std::fs::create_dir_all(output_root).map_err(|e| StemshiftError::output_error(output_root, e))?;

        let path = audio::derived_path(&input.path, output_root, kind.suffix());
        audio::write_wav(&path, buffer)?;
        info!("Wrote {}", path.display());

        Ok(input.derive(path))
    }
}

fn build_transform(kind: TransformKind, tools: &ToolPaths) -> Result<Arc<dyn AudioTransform>> {
    match kind {
        TransformKind::Rubberband => Ok(Arc::new(RubberbandTransform::new(tools.rubberband.clone()))),
        #[cfg(feature = "signalsmith")]
        TransformKind::Signalsmith => Ok(Arc::new(transform::SignalsmithTransform::new())),
        #[cfg(not(feature = "signalsmith"))]
        TransformKind::Signalsmith => Err(StemshiftError::Config(
            "the signalsmith transform is not available in this build\n  Tip: Rebuild with --features signalsmith".to_string(),
        )),
    }
}

/// Tempo of `beats`, failing when it is undefined
fn measured_bpm(path: &Path, beats: &[f64]) -> Result<f64> {
    if beats.len() < 2 {
        return Err(StemshiftError::InsufficientBeats {
            path: path.to_path_buf(),
            found: beats.len(),
        });
    }

    tempo::bpm_from_beats(beats).ok_or_else(|| StemshiftError::Detection {
        path: path.to_path_buf(),
        reason: "beat times do not increase, tempo is undefined".to_string(),
    })
}

fn validate_target_bpm(target_bpm: f64) -> Result<()> {
    if target_bpm.is_finite() && target_bpm > 0.0 {
        Ok(())
    } else {
        Err(StemshiftError::InvalidRequest(format!(
            "target BPM must be a finite number greater than 0, got {}",
            target_bpm
        )))
    }
}

/// Check every requested value before any stage runs
fn validate_request(request: &ModifyRequest) -> Result<()> {
    if let Some(bpm) = request.target_bpm {
        validate_target_bpm(bpm)?;
    } else if let Some(ratio) = request.stretch_ratio {
        transform::validate_ratio(ratio)?;
    }
    if let Some(semitones) = request.pitch_shift_semitones {
        transform::validate_semitones(semitones)?;
    }
    Ok(())
}
