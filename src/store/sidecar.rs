//! Beat Data Record sidecar
//!
//! One `beat_data.json` per output directory. Every read-modify-write holds a
//! process-wide lock keyed on the directory, so concurrent updates to
//! different fields no longer clobber each other.

use crate::error::{Result, StemshiftError};
use crate::types::{BeatData, TrackId};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info};

/// File name of the record inside an output directory
pub const SIDECAR_FILE: &str = "beat_data.json";

type DirLock = Arc<Mutex<()>>;

fn lock_registry() -> &'static Mutex<HashMap<PathBuf, DirLock>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, DirLock>>> = OnceLock::new();
    LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Handle on the Beat Data Record of one output directory
#[derive(Debug, Clone)]
pub struct BeatStore {
    root: PathBuf,
}

impl BeatStore {
    /// Open the store for `root`. Nothing is touched on disk.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(SIDECAR_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Create the directory and an empty record if absent
    ///
    /// Returns true if the record was created by this call.
    pub fn initialize(&self) -> Result<bool> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| StemshiftError::output_error(&self.root, e))?;

        let dir_lock = self.dir_lock();
        let _guard = acquire(&dir_lock);

        if self.exists() {
            debug!("Beat data already present at {}", self.path().display());
            return Ok(false);
        }

        self.write(&BeatData::default())?;
        info!("Initialized {}", self.path().display());
        Ok(true)
    }

    /// Read the current record
    pub fn read(&self) -> Result<BeatData> {
        let dir_lock = self.dir_lock();
        let _guard = acquire(&dir_lock);
        self.read_unlocked()
    }

    /// Locked read-modify-write of the whole record
    pub fn update<F>(&self, f: F) -> Result<BeatData>
    where
        F: FnOnce(&mut BeatData),
    {
        let dir_lock = self.dir_lock();
        let _guard = acquire(&dir_lock);

        let mut data = self.read_unlocked()?;
        f(&mut data);
        data.updated_at = Some(chrono::Utc::now());
        self.write(&data)?;

        Ok(data)
    }

    /// Overwrite `beats`, leaving `bpm` as it was
    pub fn set_beats(&self, track_id: Option<&TrackId>, beats: &[f64]) -> Result<BeatData> {
        let owner = track_id.cloned();
        self.update(|data| {
            data.beats = beats.to_vec();
            data.track_id = owner;
        })
    }

    /// Overwrite `bpm`, leaving `beats` as they were
    pub fn set_bpm(&self, track_id: Option<&TrackId>, bpm: f64) -> Result<BeatData> {
        let owner = track_id.cloned();
        self.update(|data| {
            data.bpm = bpm;
            data.track_id = owner;
        })
    }

    fn dir_lock(&self) -> DirLock {
        let key = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        let mut registry = acquire(lock_registry());
        registry.entry(key).or_default().clone()
    }

    fn read_unlocked(&self) -> Result<BeatData> {
        let path = self.path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StemshiftError::MissingSidecar(path));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|e| StemshiftError::CorruptSidecar {
            path,
            reason: e.to_string(),
        })
    }

    /// Write to a uniquely named temp sibling, then rename over the record
    fn write(&self, data: &BeatData) -> Result<()> {
        let path = self.path();

        let mut temp = tempfile::Builder::new()
            .prefix(".beat_data-")
            .suffix(".json.tmp")
            .tempfile_in(&self.root)
            .map_err(|e| StemshiftError::Output {
                path: path.clone(),
                reason: format!("Failed to create temp file: {}", e),
            })?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, data).map_err(|e| StemshiftError::Output {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            writer.flush().map_err(|e| StemshiftError::output_error(&path, e))?;
        }

        temp.persist(&path).map_err(|e| StemshiftError::Output {
            path: path.clone(),
            reason: format!("Failed to finalize file: {}", e.error),
        })?;

        debug!(
            "Wrote beat data ({} beats, {:.2} BPM) to {}",
            data.beats.len(),
            data.bpm,
            path.display()
        );
        Ok(())
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked
fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_before_initialize() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        assert!(matches!(store.read(), Err(StemshiftError::MissingSidecar(_))));
        assert!(matches!(
            store.set_bpm(None, 120.0),
            Err(StemshiftError::MissingSidecar(_))
        ));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path().join("nested"));
        assert!(store.initialize().unwrap());
        assert!(!store.initialize().unwrap());

        let data = store.read().unwrap();
        assert!(data.beats.is_empty());
        assert_eq!(data.bpm, 0.0);
    }

    #[test]
    fn test_initialize_keeps_existing_record() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        store.initialize().unwrap();
        store.set_bpm(None, 98.0).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.read().unwrap().bpm, 98.0);
    }

    #[test]
    fn test_fields_update_independently() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        store.initialize().unwrap();

        let id = TrackId::new("abc");
        store.set_bpm(Some(&id), 124.0).unwrap();
        store.set_beats(Some(&id), &[0.5, 1.0]).unwrap();

        let data = store.read().unwrap();
        assert_eq!(data.bpm, 124.0);
        assert_eq!(data.beats, vec![0.5, 1.0]);
        assert_eq!(data.track_id, Some(id));
        assert!(data.updated_at.is_some());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(SIDECAR_FILE)]);
    }

    #[test]
    fn test_stale_temp_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        let stale = dir.path().join("beat_data.json.tmp");
        std::fs::write(&stale, "partial").unwrap();

        store.initialize().unwrap();
        store.set_bpm(None, 111.0).unwrap();

        assert_eq!(store.read().unwrap().bpm, 111.0);
        assert_eq!(std::fs::read_to_string(&stale).unwrap(), "partial");
    }

    #[test]
    fn test_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.read(), Err(StemshiftError::CorruptSidecar { .. })));
    }

    #[test]
    fn test_reads_minimal_record() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        std::fs::write(store.path(), r#"{"beats": [1.5], "bpm": 90.0}"#).unwrap();
        let data = store.read().unwrap();
        assert_eq!(data.beats, vec![1.5]);
        assert!(data.track_id.is_none());
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_fields() {
        let dir = TempDir::new().unwrap();
        let store = BeatStore::open(dir.path());
        store.initialize().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        store.set_bpm(None, 100.0 + i as f64).unwrap();
                    } else {
                        store.set_beats(None, &[i as f64]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let data = store.read().unwrap();
        assert!(data.bpm >= 100.0);
        assert_eq!(data.beats.len(), 1);
    }
}
