//! Conversion queue orchestration.
//!
//! A queue of [`ConversionTask`]s runs strictly in order on a worker
//! thread: each task resolves to one external tool chain, its output is
//! streamed to the progress sink line by line, and per-task failures
//! are recorded without stopping the queue. The clip flow stages a
//! scrub-friendly intermediate and hands it to the annotation layer
//! before exporting trimmed clips.

mod commands;
mod orchestrator;
mod types;

pub use commands::{
    direct_ffmpeg_spec, image_convert_spec, image_to_pdf_spec, pandoc_spec, pdftoppm_spec,
    stage_spec,
};
pub use orchestrator::{Orchestrator, QueueCallbacks};
pub use types::{
    AnnotationProvider, ConversionError, ConversionTask, ConvertOptions, PromptCallback,
    PromptDecision, TaskOutcome, TaskReport,
};
