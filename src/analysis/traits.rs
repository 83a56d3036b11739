//! Analysis trait abstractions
//!
//! The detector is a black box: the orchestrator only sees beat times and
//! frame-wise activations, never the model behind them.

use crate::error::Result;
use crate::types::Activations;
use std::path::Path;

/// Beat/downbeat detection backend
pub trait BeatDetector: Send + Sync {
    /// Beat times in seconds, ascending
    fn beats(&self, path: &Path) -> Result<Vec<f64>>;

    /// Frame-wise beat activation and downbeat confidence
    fn activations(&self, path: &Path) -> Result<Activations>;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;

    /// Whether the backend can run on this system
    fn is_available(&self) -> bool {
        true
    }
}
