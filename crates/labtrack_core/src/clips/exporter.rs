//! Per-interval trim export via ffmpeg.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::annotations::{AnnotationError, AnnotationTable, Interval};
use crate::cancel::CancelToken;
use crate::formats::normalize_ext;
use crate::process::{run_streaming, CommandSpec, ExitResult, ProcessError};
use crate::progress::ProgressSink;

/// Clip export failures that stop the whole export.
///
/// A single interval's trim failing is not one of these - it is
/// recorded in that interval's [`ClipOutcome`] and the remaining
/// intervals still run.
#[derive(Error, Debug)]
pub enum ClipError {
    /// The table failed its ordering/overlap validation.
    #[error(transparent)]
    Validation(#[from] AnnotationError),

    /// ffmpeg could not be located or supervised.
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Result of exporting one interval.
#[derive(Debug, Clone)]
pub struct ClipOutcome {
    /// Interval name.
    pub interval: String,
    /// Path the clip was written to.
    pub output: PathBuf,
    /// How the trim process ended.
    pub exit: ExitResult,
}

/// Exports one clip per complete interval of a table.
#[derive(Debug, Clone)]
pub struct ClipExporter {
    ffmpeg: String,
}

impl ClipExporter {
    /// Create an exporter using the given ffmpeg name or path.
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Export every complete interval of `table`.
    ///
    /// `video` is the file frames are read from (for staged sources,
    /// the frame-accurate intermediate); `target` supplies the output
    /// naming - each clip is `<target stem>_<name>intruder.<target ext>`
    /// in `output_dir` or next to the target.
    ///
    /// Requires `table.validate()` to pass; otherwise refuses without
    /// touching any tool. Intervals are exported independently in enter
    /// order: one failing trim does not block the others, and all
    /// results are returned together so the caller can report partial
    /// success. Cancellation stops after the in-flight interval.
    pub fn export(
        &self,
        video: &Path,
        target: &Path,
        output_dir: Option<&Path>,
        table: &AnnotationTable,
        sink: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Vec<ClipOutcome>, ClipError> {
        table.validate()?;

        let mut outcomes = Vec::new();
        for interval in table.exportable() {
            if cancel.is_cancelled() {
                break;
            }

            let output = clip_output_path(target, &interval.name, output_dir);
            let spec = self.trim_spec(video, interval, &output);

            sink.note(&format!("$ {}", spec.display_line()));
            let exit = run_streaming(&spec, &mut |line| sink.output_line(line), cancel)?;

            if exit.failed() {
                tracing::warn!(
                    "Clip '{}' failed with exit code {}",
                    interval.name,
                    exit.code
                );
            } else if exit.success() {
                tracing::info!("Wrote clip {}", output.display());
            }

            let cancelled = exit.cancelled;
            outcomes.push(ClipOutcome {
                interval: interval.name.clone(),
                output,
                exit,
            });
            if cancelled {
                break;
            }
        }

        Ok(outcomes)
    }

    /// ffmpeg trim invocation for the closed frame range [enter, exit].
    ///
    /// `trim` counts end_frame exclusively, hence the +1.
    fn trim_spec(&self, video: &Path, interval: &Interval, output: &Path) -> CommandSpec {
        let enter = interval.enter.unwrap_or(0);
        let exit = interval.exit.unwrap_or(0);
        let spec = CommandSpec::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(video.to_string_lossy())
            .arg("-vf")
            .arg(format!(
                "trim=start_frame={}:end_frame={},setpts=PTS-STARTPTS",
                enter,
                exit + 1
            ))
            .arg("-an")
            .arg(output.to_string_lossy());
        match video.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => spec.cwd(dir),
            _ => spec,
        }
    }
}

/// Output path for one interval: `<stem>_<name>intruder.<ext>` derived
/// from the conversion target, placed in `output_dir` or next to it.
pub fn clip_output_path(
    target: &Path,
    interval_name: &str,
    output_dir: Option<&Path>,
) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = normalize_ext(
        &target
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    let file_name = format!("{}_{}intruder.{}", stem, interval_name, ext);
    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| target.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());
    dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, exit_code: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let log = dir.join("calls.log");
        let path = dir.join("ffmpeg");
        fs::write(
            &path,
            format!("#!/bin/sh\necho \"$@\" >> {}\nexit {}\n", log.display(), exit_code),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn valid_table() -> AnnotationTable {
        let mut table = AnnotationTable::new("trial01");
        table.set_pair("Alice", 10, 50);
        table.set_pair("Bob", 60, 90);
        table
    }

    #[test]
    fn output_naming_contract() {
        let path = clip_output_path(Path::new("/videos/trial01.mp4"), "Alice", None);
        assert_eq!(path, PathBuf::from("/videos/trial01_Aliceintruder.mp4"));

        let redirected = clip_output_path(
            Path::new("/videos/trial01.avi"),
            "Bob",
            Some(Path::new("/out")),
        );
        assert_eq!(redirected, PathBuf::from("/out/trial01_Bobintruder.avi"));
    }

    #[test]
    fn naming_follows_target_not_staged_video() {
        // The staged intermediate's stem must not leak into clip names.
        let path = clip_output_path(Path::new("/videos/trial01.mp4"), "Alice", None);
        assert!(!path.to_string_lossy().contains("_temp"));
    }

    #[test]
    fn invalid_table_blocks_export() {
        let mut table = AnnotationTable::new("trial01");
        table.set_pair("Alice", 10, 50);
        table.set_pair("Bob", 40, 60);

        let exporter = ClipExporter::new("ffmpeg-should-never-run");
        let result = exporter.export(
            Path::new("/videos/trial01.avi"),
            Path::new("/videos/trial01.mp4"),
            None,
            &table,
            &ProgressSink::disabled(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(ClipError::Validation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn exports_one_clip_per_interval() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), 0);
        let video = dir.path().join("trial01.avi");
        fs::write(&video, "").unwrap();
        let target = dir.path().join("trial01.mp4");

        let exporter = ClipExporter::new(ffmpeg.to_string_lossy());
        let outcomes = exporter
            .export(
                &video,
                &target,
                None,
                &valid_table(),
                &ProgressSink::disabled(),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.exit.success()));
        assert!(outcomes[0].output.ends_with("trial01_Aliceintruder.mp4"));
        assert!(outcomes[1].output.ends_with("trial01_Bobintruder.mp4"));

        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        // Closed interval [10, 50] -> exclusive end_frame 51.
        assert!(calls.contains("trim=start_frame=10:end_frame=51"));
        assert!(calls.contains("trim=start_frame=60:end_frame=91"));
    }

    #[cfg(unix)]
    #[test]
    fn one_failure_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), 1);
        let video = dir.path().join("trial01.avi");
        fs::write(&video, "").unwrap();

        let exporter = ClipExporter::new(ffmpeg.to_string_lossy());
        let outcomes = exporter
            .export(
                &video,
                &dir.path().join("trial01.mp4"),
                None,
                &valid_table(),
                &ProgressSink::disabled(),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.exit.failed()));
    }

    #[test]
    fn missing_ffmpeg_aborts_export() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("trial01.avi");
        fs::write(&video, "").unwrap();

        let exporter = ClipExporter::new("no_such_ffmpeg_binary_654321");
        let result = exporter.export(
            &video,
            &dir.path().join("trial01.mp4"),
            None,
            &valid_table(),
            &ProgressSink::disabled(),
            &CancelToken::new(),
        );
        assert!(matches!(
            result,
            Err(ClipError::Process(ProcessError::ToolNotFound { .. }))
        ));
    }
}
