//! Batch planner/runner for tracking inference.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::cli::TrackerCliOptions;
use super::discovery::{discover_videos, BatchItem};
use super::status_log::{Status, StatusLog};
use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::process::{
    resolve_conda_executable, resolve_tool, run_streaming, CondaFallback, ResolvedCommand,
    ToolCandidate,
};
use crate::progress::ProgressSink;

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Walk subdirectories of the videos root.
    pub recurse: bool,
    /// Skip items whose latest log status is OK.
    pub skip_if_last_ok: bool,
    /// Flags for the tracking CLI.
    pub cli: TrackerCliOptions,
}

/// Terminal state of one batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Tracker exited 0; outcome appended to the log as OK.
    Ok,
    /// Tracker failed or could not start; appended to the log as FAIL.
    Failed(String),
    /// Skipped per the status log - a distinct outcome, not OK or FAIL.
    Skipped,
    /// Interrupted by cancellation; nothing appended to the log.
    Cancelled,
}

/// Outcome of one item, paired with the item for reporting.
#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: BatchItem,
    pub status: ItemStatus,
}

/// Failures that prevent the batch from running at all.
///
/// Per-item problems are recorded in [`ItemReport`]s instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to create predictions directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read status log: {0}")]
    ReadLog(#[from] io::Error),
}

/// Discovers items, runs the tracker per item, and records outcomes.
pub struct BatchRunner {
    settings: Settings,
    search_path: Option<OsString>,
}

impl BatchRunner {
    /// Create a runner over the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            search_path: None,
        }
    }

    /// Resolve tools against an explicit PATH-like string instead of
    /// the process environment.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Run the batch.
    ///
    /// Discovers videos under `videos_root`, skips items the log marks
    /// OK (when requested), invokes the tracker once per item with its
    /// output streamed to `sink`, and appends each OK/FAIL outcome to
    /// `log` keyed by the item's relative path. One item failing never
    /// aborts the batch; cancellation stops after the in-flight item
    /// and preserves completed outcomes.
    pub fn run(
        &self,
        videos_root: &Path,
        predictions_root: &Path,
        log: &StatusLog,
        options: &BatchOptions,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Vec<ItemReport>, BatchError> {
        std::fs::create_dir_all(predictions_root).map_err(|e| BatchError::CreateOutputDir {
            path: predictions_root.to_path_buf(),
            source: e,
        })?;

        let latest = if options.skip_if_last_ok {
            log.latest()?
        } else {
            Default::default()
        };

        let items = discover_videos(
            videos_root,
            options.recurse,
            &self.settings.video_extensions,
            &self.settings.frame_cache_suffix,
        );
        let total = items.len();
        let mut reports = Vec::with_capacity(total);

        for (index, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Batch cancelled at item {}/{}", index + 1, total);
                break;
            }

            let name = item.name();
            sink.task_started(index, total, &name);

            if options.skip_if_last_ok && latest.get(&item.key()) == Some(&Status::Ok) {
                sink.note(&format!("Skip (OK in log): {}", item.input.display()));
                reports.push(ItemReport {
                    item,
                    status: ItemStatus::Skipped,
                });
                sink.task_done(index, total, &name);
                continue;
            }

            let status = self.run_item(&item, predictions_root, log, options, sink, cancel);
            let stop = status == ItemStatus::Cancelled;
            reports.push(ItemReport { item, status });
            sink.task_done(index, total, &name);

            if stop {
                break;
            }
        }

        Ok(reports)
    }

    fn run_item(
        &self,
        item: &BatchItem,
        predictions_root: &Path,
        log: &StatusLog,
        options: &BatchOptions,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> ItemStatus {
        let output_path = item.output_path(predictions_root);
        let resolved = self.resolve_tracker();

        sink.note(&format!("Running sleap-nn track: {}", item.input.display()));
        let mut spec = resolved
            .to_spec()
            .args(options.cli.to_args(&item.input, &output_path))
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8");
        if let Some(dir) = item.input.parent() {
            if !dir.as_os_str().is_empty() {
                spec = spec.cwd(dir);
            }
        }
        sink.note(&format!("$ {}", spec.display_line()));

        let exit = match run_streaming(&spec, &mut |line| sink.output_line(line), cancel) {
            Ok(exit) => exit,
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("Tracker failed to start for {}: {}", item.key(), reason);
                self.record(log, item, Status::Fail, &reason);
                return ItemStatus::Failed(reason);
            }
        };

        if exit.cancelled {
            return ItemStatus::Cancelled;
        }
        if exit.code == 0 {
            self.record(log, item, Status::Ok, &output_path.display().to_string());
            ItemStatus::Ok
        } else {
            let reason = format!("exit code {}", exit.code);
            self.record(log, item, Status::Fail, &exit.code.to_string());
            ItemStatus::Failed(reason)
        }
    }

    /// A log write failing must not abort the batch.
    fn record(&self, log: &StatusLog, item: &BatchItem, status: Status, message: &str) {
        if let Err(e) = log.append(&item.key(), status, message) {
            tracing::warn!("Failed to append status log entry for {}: {}", item.key(), e);
        }
    }

    /// Override -> PATH (`sleap-nn-track`, then `sleap-nn track`) ->
    /// `conda run -n <env> sleap-nn track`.
    fn resolve_tracker(&self) -> ResolvedCommand {
        let fallback = CondaFallback {
            conda: resolve_conda_executable(self.search_path(), self.home_dir().as_deref()),
            env: self.settings.tools.conda_env.clone(),
            command: vec!["sleap-nn".to_string(), "track".to_string()],
        };
        // The conda fallback always yields a command, so this cannot fail;
        // a missing conda surfaces when the item runs and is logged FAIL.
        resolve_tool(
            self.settings.tools.tracker_override.as_deref(),
            &["track"],
            &[
                ToolCandidate {
                    binary: "sleap-nn-track",
                    args: &[],
                },
                ToolCandidate {
                    binary: "sleap-nn",
                    args: &["track"],
                },
            ],
            self.search_path(),
            Some(&fallback),
        )
        .unwrap_or(ResolvedCommand {
            program: fallback.conda,
            leading_args: Vec::new(),
        })
    }

    fn search_path(&self) -> Option<&OsStr> {
        self.search_path.as_deref()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}
