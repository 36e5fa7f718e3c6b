//! Per-strategy command assembly.
//!
//! Pure builders from a task to a [`CommandSpec`]; nothing here spawns
//! anything.

use std::path::Path;

use super::types::ConversionTask;
use crate::process::CommandSpec;

/// Stage a scrub-friendly MJPEG AVI intermediate.
///
/// Every frame is intra-coded, so clip boundaries can be seeked
/// frame-accurately regardless of the source's GOP structure.
pub fn stage_spec(ffmpeg: &str, input: &Path, staged: &Path) -> CommandSpec {
    let spec = CommandSpec::new(ffmpeg)
        .arg("-i")
        .arg(input.to_string_lossy())
        .args(["-c:v", "mjpeg", "-qscale:v", "2", "-pix_fmt", "yuvj420p"])
        .args(["-vtag", "MJPG", "-r", "25", "-y"])
        .arg(staged.to_string_lossy());
    with_task_cwd(spec, input)
}

/// Direct ffmpeg transcode with machine-readable progress on stdout.
pub fn direct_ffmpeg_spec(ffmpeg: &str, task: &ConversionTask) -> CommandSpec {
    let spec = CommandSpec::new(ffmpeg)
        .arg("-i")
        .arg(task.source.to_string_lossy())
        .args(["-progress", "pipe:1", "-y"])
        .arg(task.target.to_string_lossy());
    with_task_cwd(spec, &task.source)
}

/// Image format change via ffmpeg.
pub fn image_convert_spec(ffmpeg: &str, task: &ConversionTask) -> CommandSpec {
    let spec = CommandSpec::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(task.source.to_string_lossy())
        .arg(task.target.to_string_lossy());
    with_task_cwd(spec, &task.source)
}

/// Wrap an image into a single-page PDF via ImageMagick.
pub fn image_to_pdf_spec(magick: &str, task: &ConversionTask) -> CommandSpec {
    let spec = CommandSpec::new(magick)
        .arg(task.source.to_string_lossy())
        .arg(task.target.to_string_lossy());
    with_task_cwd(spec, &task.source)
}

/// Document conversion via pandoc.
pub fn pandoc_spec(pandoc: &str, task: &ConversionTask) -> CommandSpec {
    let spec = CommandSpec::new(pandoc)
        .arg(task.source.to_string_lossy())
        .arg("-o")
        .arg(task.target.to_string_lossy());
    with_task_cwd(spec, &task.source)
}

/// Rasterize PDF pages via pdftoppm into files named `<prefix>-<N>.<ext>`.
///
/// The orchestrator renames the produced pages onto the
/// `<stem>_page<N>.<ext>` contract afterwards.
pub fn pdftoppm_spec(pdftoppm: &str, task: &ConversionTask, prefix: &Path) -> CommandSpec {
    let format_flag = match task.target_ext.as_str() {
        "png" => "-png",
        _ => "-jpeg",
    };
    let spec = CommandSpec::new(pdftoppm)
        .arg(format_flag)
        .arg(task.source.to_string_lossy())
        .arg(prefix.to_string_lossy());
    with_task_cwd(spec, &task.source)
}

/// Tools run with CWD at the task's working directory (the source's
/// parent), matching the external tool invocation contract.
fn with_task_cwd(spec: CommandSpec, source: &Path) -> CommandSpec {
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => spec.cwd(dir),
        _ => spec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatResolver;
    use std::path::PathBuf;

    fn task(source: &str, output_ext: &str) -> ConversionTask {
        ConversionTask::resolve(
            Path::new(source),
            output_ext,
            None,
            &FormatResolver::standard(),
            false,
        )
        .unwrap()
    }

    #[test]
    fn stage_uses_mjpeg_recipe() {
        let spec = stage_spec(
            "ffmpeg",
            Path::new("/v/a.mp4"),
            Path::new("/v/a_temp.avi"),
        );
        let args = spec.arg_list();
        assert!(args.windows(2).any(|w| w == ["-c:v", "mjpeg"]));
        assert!(args.windows(2).any(|w| w == ["-qscale:v", "2"]));
        assert!(args.windows(2).any(|w| w == ["-vtag", "MJPG"]));
        assert_eq!(args.last().map(String::as_str), Some("/v/a_temp.avi"));
    }

    #[test]
    fn direct_ffmpeg_streams_progress() {
        let spec = direct_ffmpeg_spec("ffmpeg", &task("/v/a.mp4", "mkv"));
        let args = spec.arg_list();
        assert!(args.windows(2).any(|w| w == ["-progress", "pipe:1"]));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/v/a.mkv"));
    }

    #[test]
    fn pandoc_names_output_explicitly() {
        let spec = pandoc_spec("pandoc", &task("/d/report.txt", "docx"));
        assert_eq!(
            spec.arg_list(),
            &["/d/report.txt", "-o", "/d/report.docx"]
        );
    }

    #[test]
    fn pdftoppm_picks_format_flag() {
        let png = pdftoppm_spec(
            "pdftoppm",
            &task("/d/scan.pdf", "png"),
            &PathBuf::from("/d/scan_pages"),
        );
        assert_eq!(png.arg_list()[0], "-png");

        let jpg = pdftoppm_spec(
            "pdftoppm",
            &task("/d/scan.pdf", "jpg"),
            &PathBuf::from("/d/scan_pages"),
        );
        assert_eq!(jpg.arg_list()[0], "-jpeg");
    }
}
