//! termsnap - render terminal output to PNG screenshots and GIF animations
//!
//! The library half of the `termsnap` binary: the command-line definition,
//! the batch manifest format and the recording steps that tie capture,
//! emulation and rasterization together.

pub mod cli;
pub mod manifest;
pub mod record;

pub use manifest::{CommandLine, Defaults, Demo, DemoKind, Manifest};
pub use record::{AnimationOptions, BatchSummary, RenderSettings};
