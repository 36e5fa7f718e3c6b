//! Queue orchestrator: sequences per-file conversion steps.

use std::fs;
use std::path::{Path, PathBuf};

use super::commands;
use super::types::{
    AnnotationProvider, ConversionError, ConversionTask, ConvertOptions, PromptCallback,
    PromptDecision, TaskOutcome, TaskReport,
};
use crate::cancel::CancelToken;
use crate::clips::ClipExporter;
use crate::config::ToolSettings;
use crate::formats::{FormatResolver, Strategy};
use crate::process::{run_streaming, CommandSpec};
use crate::progress::ProgressSink;

/// Staged intermediates smaller than this are considered invalid.
const MIN_STAGED_BYTES: u64 = 1000;

/// Inputs the clip flow accepts.
const CLIP_INPUTS: &[&str] = &["seq", "mp4", "avi"];

/// Callbacks the control thread supplies to a queue run.
#[derive(Default)]
pub struct QueueCallbacks {
    /// Asked before each file when `prompt_per_file` is set.
    pub prompt: Option<PromptCallback>,
    /// Supplies annotations for staged videos in the clip flow.
    pub annotate: Option<AnnotationProvider>,
}

/// Runs queues of conversion tasks against the configured tools.
pub struct Orchestrator {
    tools: ToolSettings,
    resolver: FormatResolver,
}

impl Orchestrator {
    /// Create an orchestrator with the standard format table.
    pub fn new(tools: ToolSettings) -> Self {
        Self::with_resolver(tools, FormatResolver::standard())
    }

    /// Create an orchestrator over an explicit format resolver.
    pub fn with_resolver(tools: ToolSettings, resolver: FormatResolver) -> Self {
        Self { tools, resolver }
    }

    /// The format resolver used for task resolution.
    pub fn resolver(&self) -> &FormatResolver {
        &self.resolver
    }

    /// Run a queue of tasks strictly in order.
    ///
    /// Per-task failures are recorded and iteration continues unless
    /// `abort_on_failure` is set. Cancellation stops dequeuing and
    /// reports the in-flight task as cancelled; results of tasks that
    /// already completed are preserved. Progress and subprocess output
    /// are delivered incrementally through `sink`, with each task's
    /// completion event after all of its output lines.
    pub fn run_queue(
        &self,
        tasks: &[ConversionTask],
        options: &ConvertOptions,
        callbacks: &QueueCallbacks,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Vec<TaskReport> {
        let total = tasks.len();
        let mut reports = Vec::with_capacity(total);

        for (index, task) in tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Queue cancelled before task {}/{}", index + 1, total);
                break;
            }

            let name = task.name();
            sink.task_started(index, total, &name);

            if options.prompt_per_file {
                let decision = callbacks
                    .prompt
                    .as_ref()
                    .map(|prompt| prompt(task))
                    .unwrap_or(PromptDecision::Proceed);
                match decision {
                    PromptDecision::Proceed => {}
                    PromptDecision::Skip => {
                        sink.note(&format!("Skipped by user: {}", name));
                        reports.push(TaskReport {
                            source: task.source.clone(),
                            outcome: TaskOutcome::Skipped("declined at prompt".to_string()),
                        });
                        sink.task_done(index, total, &name);
                        continue;
                    }
                    PromptDecision::Abort => {
                        tracing::info!("Queue aborted at prompt for {}", name);
                        reports.push(TaskReport {
                            source: task.source.clone(),
                            outcome: TaskOutcome::Cancelled,
                        });
                        sink.task_done(index, total, &name);
                        break;
                    }
                }
            }

            let outcome = match self.execute_task(task, options, callbacks, sink, cancel) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Task {} failed: {}", name, e);
                    TaskOutcome::Failed(e.to_string())
                }
            };

            let stop = matches!(outcome, TaskOutcome::Cancelled)
                || (options.abort_on_failure && outcome.is_failure());

            reports.push(TaskReport {
                source: task.source.clone(),
                outcome,
            });
            sink.task_done(index, total, &name);

            if stop {
                break;
            }
        }

        reports
    }

    fn execute_task(
        &self,
        task: &ConversionTask,
        options: &ConvertOptions,
        callbacks: &QueueCallbacks,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        match task.strategy {
            Strategy::StageThenTrim => self.run_clip_flow(task, options, callbacks, sink, cancel),
            Strategy::DirectFfmpeg => self.run_tool(
                commands::direct_ffmpeg_spec(&self.tools.ffmpeg, task),
                "ffmpeg",
                sink,
                cancel,
            ),
            Strategy::ImageConvert => self.run_tool(
                commands::image_convert_spec(&self.tools.ffmpeg, task),
                "ffmpeg",
                sink,
                cancel,
            ),
            Strategy::ImageToPdf => self.run_tool(
                commands::image_to_pdf_spec(&self.tools.magick, task),
                "magick",
                sink,
                cancel,
            ),
            Strategy::PandocDoc => self.run_tool(
                commands::pandoc_spec(&self.tools.pandoc, task),
                "pandoc",
                sink,
                cancel,
            ),
            Strategy::PdfToImage => self.run_pdf_to_image(task, sink, cancel),
            Strategy::DocxToPdfWord => Err(ConversionError::unsupported(
                &task.source_ext,
                &task.target_ext,
                "requires Microsoft Word, which is unavailable in this environment",
            )),
        }
    }

    /// Run a single-command strategy to completion.
    fn run_tool(
        &self,
        spec: CommandSpec,
        tool: &str,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        sink.note(&format!("$ {}", spec.display_line()));
        let exit = run_streaming(&spec, &mut |line| sink.output_line(line), cancel)?;

        if exit.cancelled {
            return Ok(TaskOutcome::Cancelled);
        }
        if exit.code != 0 {
            return Err(ConversionError::ProcessFailed {
                tool: tool.to_string(),
                code: exit.code,
            });
        }
        Ok(TaskOutcome::Completed)
    }

    /// PDF page export: rasterize with pdftoppm, then rename the pages
    /// onto the `<stem>_page<N>.<ext>` contract (N from 0).
    fn run_pdf_to_image(
        &self,
        task: &ConversionTask,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        let stem = task
            .target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = task
            .target
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let tmp_prefix = format!("{}_pages_tmp", stem);

        let spec = commands::pdftoppm_spec(&self.tools.pdftoppm, task, &dir.join(&tmp_prefix));
        match self.run_tool(spec, "pdftoppm", sink, cancel)? {
            TaskOutcome::Completed => {}
            other => return Ok(other),
        }

        let pages = finalize_pdf_pages(&dir, &tmp_prefix, &stem, &task.target_ext)
            .map_err(|e| ConversionError::io("collecting PDF pages", e))?;
        if pages.is_empty() {
            return Err(ConversionError::NoPages {
                path: task.source.clone(),
            });
        }

        tracing::info!("Wrote {} page(s) for {}", pages.len(), task.source.display());
        Ok(TaskOutcome::Completed)
    }

    /// Clip flow: stage a frame-accurate intermediate, collect
    /// annotations, export one trimmed clip per interval.
    fn run_clip_flow(
        &self,
        task: &ConversionTask,
        options: &ConvertOptions,
        callbacks: &QueueCallbacks,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        if !CLIP_INPUTS.contains(&task.source_ext.as_str()) {
            return Err(ConversionError::unsupported(
                &task.source_ext,
                &task.target_ext,
                "clipped output requires .seq, .mp4, or .avi input",
            ));
        }
        if task.target_ext == "gif" {
            return Err(ConversionError::unsupported(
                &task.source_ext,
                &task.target_ext,
                "GIF output is not supported for clipping",
            ));
        }

        // .avi sources are already frame-accurate; use them directly.
        let (staged, staged_is_temp) = if task.source_ext == "avi" {
            (task.source.clone(), false)
        } else {
            let staged = task.source.with_file_name(format!(
                "{}_temp.avi",
                task.source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ));
            match self.stage_intermediate(task, &staged, sink, cancel)? {
                TaskOutcome::Completed => {}
                other => return Ok(other),
            }
            (staged, true)
        };

        let result = self.export_clips(task, options, callbacks, &staged, sink, cancel);

        if staged_is_temp {
            if let Err(e) = fs::remove_file(&staged) {
                tracing::warn!("Failed to remove staged file {}: {}", staged.display(), e);
            }
        }

        result
    }

    fn stage_intermediate(
        &self,
        task: &ConversionTask,
        staged: &Path,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        let spec = commands::stage_spec(&self.tools.ffmpeg, &task.source, staged);
        match self.run_tool(spec, "ffmpeg", sink, cancel)? {
            TaskOutcome::Completed => {}
            other => return Ok(other),
        }

        let valid = fs::metadata(staged)
            .map(|m| m.len() >= MIN_STAGED_BYTES)
            .unwrap_or(false);
        if !valid {
            return Err(ConversionError::StagingInvalid {
                path: staged.to_path_buf(),
            });
        }
        Ok(TaskOutcome::Completed)
    }

    fn export_clips(
        &self,
        task: &ConversionTask,
        options: &ConvertOptions,
        callbacks: &QueueCallbacks,
        staged: &Path,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TaskOutcome, ConversionError> {
        let provider = match callbacks.annotate.as_ref() {
            Some(provider) => provider,
            None => {
                return Ok(TaskOutcome::Skipped(
                    "no annotation provider wired".to_string(),
                ))
            }
        };

        let table = match provider(task, staged) {
            Some(table) => table,
            None => return Ok(TaskOutcome::Skipped("annotation cancelled".to_string())),
        };

        let exporter = ClipExporter::new(self.tools.ffmpeg.as_str());
        let outcomes = exporter.export(
            staged,
            &task.target,
            options.output_dir.as_deref(),
            &table,
            sink,
            cancel,
        )?;

        if outcomes.iter().any(|o| o.exit.cancelled) {
            return Ok(TaskOutcome::Cancelled);
        }

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.exit.failed())
            .map(|o| o.interval.as_str())
            .collect();
        if !failed.is_empty() {
            return Ok(TaskOutcome::Failed(format!(
                "clip export failed for: {}",
                failed.join(", ")
            )));
        }

        Ok(TaskOutcome::Completed)
    }
}

/// Rename pdftoppm's `<prefix>-<N>.<ext>` outputs to the
/// `<stem>_page<N>.<ext>` contract, numbering pages from 0 in page
/// order. Returns the final paths.
fn finalize_pdf_pages(
    dir: &Path,
    tmp_prefix: &str,
    stem: &str,
    ext: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let suffix = format!(".{}", ext);
    let mut produced: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(tmp_prefix) && name.ends_with(&suffix) {
            produced.push(name);
        }
    }
    // Same prefix and suffix, so a longer name means a larger page number.
    produced.sort_by_key(|name| (name.len(), name.clone()));

    let mut pages = Vec::with_capacity(produced.len());
    for (index, name) in produced.iter().enumerate() {
        let final_path = dir.join(format!("{}_page{}.{}", stem, index, ext));
        fs::rename(dir.join(name), &final_path)?;
        pages.push(final_path);
    }
    Ok(pages)
}
