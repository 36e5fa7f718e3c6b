//! Batch item discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::status_log::canon_key;
use crate::formats::normalize_ext;

/// One discovered input video and where it sits relative to the scan
/// root. Lives only for the duration of a batch run; only its outcome
/// is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Absolute (or root-joined) input path.
    pub input: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
}

impl BatchItem {
    /// Status-log key for this item.
    pub fn key(&self) -> String {
        canon_key(&self.relative)
    }

    /// Output file name: `<relative-path-sanitized>.predictions.slp`.
    pub fn output_name(&self) -> String {
        format!("{}.predictions.slp", sanitize_relative(&self.relative))
    }

    /// Full output path under the predictions root.
    pub fn output_path(&self, predictions_root: &Path) -> PathBuf {
        predictions_root.join(self.output_name())
    }

    /// Display name for progress reporting.
    pub fn name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Flatten a relative path into a single safe file name.
///
/// Separators and characters that are unsafe on common filesystems all
/// become `_`, so the result can neither traverse directories nor
/// collide with reserved syntax.
pub fn sanitize_relative(relative: &Path) -> String {
    canon_key(relative)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Collect video files under `root`.
///
/// Directories whose names end in `frame_cache_suffix` are pruned
/// entirely from the walk - nothing beneath them is considered. With
/// `recurse` off, only regular files directly under the root are
/// listed. A missing root yields an empty list.
pub fn discover_videos(
    root: &Path,
    recurse: bool,
    extensions: &[String],
    frame_cache_suffix: &str,
) -> Vec<BatchItem> {
    let mut items = Vec::new();

    let wanted = |path: &Path| -> bool {
        path.extension()
            .map(|e| {
                let ext = normalize_ext(&e.to_string_lossy());
                extensions.iter().any(|w| *w == ext)
            })
            .unwrap_or(false)
    };

    if recurse {
        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .ends_with(frame_cache_suffix))
        });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry during discovery: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !wanted(entry.path()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(root) {
                items.push(BatchItem {
                    input: entry.path().to_path_buf(),
                    relative: relative.to_path_buf(),
                });
            }
        }
    } else {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(_) => return items,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && wanted(&path) {
                if let Some(file_name) = path.file_name() {
                    items.push(BatchItem {
                        input: path.clone(),
                        relative: PathBuf::from(file_name),
                    });
                }
            }
        }
    }

    items.sort_by(|a, b| a.input.cmp(&b.input));
    tracing::info!("Discovered {} batch item(s) under {}", items.len(), root.display());
    items
}
