//! LabTrack Core - backend logic for the LabTrack desktop tools.
//!
//! This crate contains all business logic with zero UI dependencies:
//! file conversion, annotation-based clip export, and batch pose-tracking
//! runs. It can be used by the GUI application or a CLI tool.

pub mod annotations;
pub mod batch;
pub mod cancel;
pub mod clips;
pub mod config;
pub mod conversion;
pub mod formats;
pub mod process;
pub mod progress;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
