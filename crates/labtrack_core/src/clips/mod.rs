//! Annotation-driven clip export.
//!
//! Turns a validated [`AnnotationTable`] into one trimmed output file
//! per named interval by delegating the frame-accurate trim to ffmpeg.
//!
//! [`AnnotationTable`]: crate::annotations::AnnotationTable

mod exporter;

pub use exporter::{clip_output_path, ClipError, ClipExporter, ClipOutcome};
