//! Settings model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Locations and names of the external tools the workflows invoke.
///
/// Plain names are resolved on PATH at run time; absolute paths are
/// used as-is. The tracker/labeler overrides correspond to the
/// `SLEAP_NN` / `SLEAP_LABEL` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// ffmpeg binary (video transcode, staging, clip trims).
    pub ffmpeg: String,
    /// pandoc binary (document conversions).
    pub pandoc: String,
    /// pdftoppm binary (PDF page rasterization).
    pub pdftoppm: String,
    /// ImageMagick binary (image to PDF).
    pub magick: String,
    /// Explicit path to the tracking CLI, bypassing PATH/conda lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker_override: Option<PathBuf>,
    /// Explicit path to the labeler GUI, bypassing PATH/conda lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labeler_override: Option<PathBuf>,
    /// Conda environment name used for fallback invocations.
    pub conda_env: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            pandoc: "pandoc".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            magick: "magick".to_string(),
            tracker_override: None,
            labeler_override: None,
            conda_env: "sleap".to_string(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default output directory; `None` writes next to each source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Directories whose names end in this suffix are pruned from
    /// batch discovery (frame caches).
    pub frame_cache_suffix: String,
    /// Extensions considered batch candidates (no dots).
    pub video_extensions: Vec<String>,
    /// External tool configuration.
    pub tools: ToolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: None,
            frame_cache_suffix: "_frames".to_string(),
            video_extensions: ["mp4", "avi", "mov", "mkv", "h5"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tools: ToolSettings::default(),
        }
    }
}

impl Settings {
    /// Pick up tool overrides from the environment.
    ///
    /// `SLEAP_NN` and `SLEAP_LABEL` take effect only when the config
    /// file left the corresponding override unset.
    pub fn apply_env_overrides(&mut self) {
        if self.tools.tracker_override.is_none() {
            if let Some(path) = env_path("SLEAP_NN") {
                self.tools.tracker_override = Some(path);
            }
        }
        if self.tools.labeler_override.is_none() {
            if let Some(path) = env_path("SLEAP_LABEL") {
                self.tools.labeler_override = Some(path);
            }
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
