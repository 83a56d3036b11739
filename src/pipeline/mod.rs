//! Pipeline orchestration and stage planning

pub mod orchestrator;
pub mod stages;

pub use orchestrator::{JobOutcome, Orchestrator};
pub use stages::{plan, Stage, TempoChange};
