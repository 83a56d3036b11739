//! Per-track result cache with expiry

use crate::types::{BeatAnalysis, TrackId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Latest analysis per track, each entry valid for `ttl`
#[derive(Debug)]
pub struct TrackCache {
    ttl: Duration,
    entries: Mutex<HashMap<TrackId, (BeatAnalysis, Instant)>>,
}

impl TrackCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `data` for `id`, replacing any previous entry
    pub fn insert(&self, id: TrackId, data: BeatAnalysis) {
        self.insert_at(id, data, Instant::now());
    }

    /// Fetch the entry for `id`, evicting it if it has expired
    pub fn get(&self, id: &TrackId) -> Option<BeatAnalysis> {
        self.get_at(id, Instant::now())
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, (_, inserted)| now.duration_since(*inserted) < self.ttl);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Evicted {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&self, id: TrackId, data: BeatAnalysis, at: Instant) {
        self.lock().insert(id, (data, at));
    }

    fn get_at(&self, id: &TrackId, now: Instant) -> Option<BeatAnalysis> {
        let mut entries = self.lock();
        let expired = match entries.get(id) {
            Some((_, inserted)) => now.saturating_duration_since(*inserted) >= self.ttl,
            None => return None,
        };

        if expired {
            debug!("Cache entry for {} expired", id);
            entries.remove(id);
            return None;
        }
        entries.get(id).map(|(data, _)| data.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TrackId, (BeatAnalysis, Instant)>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bpm: f64) -> BeatAnalysis {
        BeatAnalysis {
            beats: vec![0.0, 60.0 / bpm],
            bpm: Some(bpm),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let cache = TrackCache::new(Duration::from_secs(60));
        let id = TrackId::new("abc");
        cache.insert(id.clone(), record(120.0));
        assert_eq!(cache.get(&id).and_then(|d| d.bpm), Some(120.0));
        assert!(cache.get(&TrackId::new("other")).is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let cache = TrackCache::new(Duration::from_secs(60));
        let id = TrackId::new("abc");
        cache.insert(id.clone(), record(120.0));
        cache.insert(id.clone(), record(90.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id).and_then(|d| d.bpm), Some(90.0));
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let cache = TrackCache::new(Duration::from_secs(10));
        let id = TrackId::new("abc");
        let start = Instant::now();
        cache.insert_at(id.clone(), record(120.0), start);

        assert!(cache.get_at(&id, start + Duration::from_secs(5)).is_some());
        assert!(cache.get_at(&id, start + Duration::from_secs(10)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = TrackCache::new(Duration::ZERO);
        cache.insert(TrackId::new("a"), record(1.0));
        cache.insert(TrackId::new("b"), record(2.0));
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }
}
