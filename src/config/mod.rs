//! Configuration and CLI handling

pub mod cli;
pub mod settings;

pub use cli::{Cli, Command, DetectorKind, GlobalArgs, RunArgs, ServeArgs, TransformKind};
pub use settings::{PipelineSettings, Settings, ToolPaths};
