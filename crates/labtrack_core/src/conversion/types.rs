//! Conversion task model, options, and outcomes.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::annotations::AnnotationTable;
use crate::clips::ClipError;
use crate::formats::{normalize_ext, FormatError, FormatResolver, Strategy};
use crate::process::ProcessError;

/// One file conversion, resolved and ready to execute.
///
/// Immutable once created; consumed exactly once by the orchestrator.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    /// Input file.
    pub source: PathBuf,
    /// Output file (directory + stem + target extension).
    pub target: PathBuf,
    /// Normalized source extension.
    pub source_ext: String,
    /// Normalized target extension.
    pub target_ext: String,
    /// Tool chain selected by the format resolver.
    pub strategy: Strategy,
}

impl ConversionTask {
    /// Resolve a queued file against a chosen output format.
    ///
    /// The target lands in `output_dir` when given, otherwise next to
    /// the source. Fails when no strategy covers the pair.
    pub fn resolve(
        source: &Path,
        output_ext: &str,
        output_dir: Option<&Path>,
        resolver: &FormatResolver,
        clip: bool,
    ) -> Result<Self, FormatError> {
        let source_ext = normalize_ext(
            &source
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let target_ext = normalize_ext(output_ext);
        let strategy = resolver.strategy_for(&source_ext, &target_ext, clip)?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| source.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());
        let target = dir.join(format!("{}.{}", stem, target_ext));

        Ok(Self {
            source: source.to_path_buf(),
            target,
            source_ext,
            target_ext,
            strategy,
        })
    }

    /// Display name for progress reporting (the source file name).
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Options recognized by the queue orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Run the clip flow (stage + annotate + trim) for video inputs.
    pub clip: bool,
    /// Ask the prompt callback before each file.
    pub prompt_per_file: bool,
    /// Override output directory; `None` writes next to each source.
    pub output_dir: Option<PathBuf>,
    /// Stop the queue at the first failed task.
    pub abort_on_failure: bool,
}

/// Caller's answer to a per-file prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDecision {
    /// Process this file.
    Proceed,
    /// Skip this file, keep going.
    Skip,
    /// Stop the whole queue.
    Abort,
}

/// Decision callback for prompt-per-file mode.
///
/// The worker blocks on this until the control thread answers.
pub type PromptCallback = Box<dyn Fn(&ConversionTask) -> PromptDecision + Send>;

/// Supplies the annotation table for a staged video in the clip flow.
///
/// Receives the task and the path of the frame-accurate intermediate;
/// returning `None` means the user cancelled annotation.
pub type AnnotationProvider = Box<dyn Fn(&ConversionTask, &Path) -> Option<AnnotationTable> + Send>;

/// Terminal state of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Converted successfully.
    Completed,
    /// Not attempted (user declined, annotation cancelled, ...).
    Skipped(String),
    /// Attempted and failed; the queue keeps going.
    Failed(String),
    /// Interrupted by cancellation - distinct from failure.
    Cancelled,
}

impl TaskOutcome {
    /// Whether this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failed(_))
    }
}

/// Outcome of one task, paired with its source for reporting.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Source file the task consumed.
    pub source: PathBuf,
    /// How it ended.
    pub outcome: TaskOutcome,
}

/// Errors raised while executing a single conversion task.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// No tool chain can honor this pair in this environment.
    #[error("unsupported conversion from .{input} to .{output}: {detail}")]
    Unsupported {
        input: String,
        output: String,
        detail: String,
    },

    /// Tool lookup or process supervision failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The tool ran but exited non-zero.
    #[error("{tool} failed with exit code {code}")]
    ProcessFailed { tool: String, code: i32 },

    /// The staged intermediate looks empty or invalid.
    #[error("staged intermediate {path} seems empty or invalid")]
    StagingInvalid { path: PathBuf },

    /// PDF rasterization produced no page images.
    #[error("no pages produced from {path}")]
    NoPages { path: PathBuf },

    /// Clip export refused or aborted.
    #[error(transparent)]
    Clip(#[from] ClipError),

    /// Filesystem work around the conversion failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ConversionError {
    /// Create an unsupported-conversion error.
    pub fn unsupported(
        input: impl Into<String>,
        output: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            input: input.into(),
            output: output.into(),
            detail: detail.into(),
        }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

impl From<FormatError> for ConversionError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnsupportedConversion { input, output } => Self::Unsupported {
                input,
                output,
                detail: "no strategy covers this pair".to_string(),
            },
        }
    }
}
