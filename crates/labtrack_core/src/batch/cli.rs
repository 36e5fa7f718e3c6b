//! Typed options mirroring the sleap-nn `track` CLI.
//!
//! Argument assembly rules: `--data_path` and `--output_path` always
//! lead, booleans emit bare flags only when set, unset optionals are
//! omitted, repeated path options emit one flag per value, and a
//! default model path is injected when none was configured.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Peak localization refinement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegralRefinement {
    #[default]
    Integral,
    None,
}

impl IntegralRefinement {
    /// CLI value.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegralRefinement::Integral => "integral",
            IntegralRefinement::None => "none",
        }
    }
}

/// Structured flag set for one tracking invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerCliOptions {
    /// Model directories (`--model_paths`, one flag per value).
    pub model_paths: Vec<PathBuf>,
    /// Injected as `--model_paths` when `model_paths` is empty.
    pub default_model: Option<PathBuf>,
    /// `--device`: auto | cpu | cuda:0 ...
    pub device: String,
    /// `--batch_size`.
    pub batch_size: u32,
    /// `--max_instances`, omitted when unset.
    pub max_instances: Option<u32>,
    /// `--tracking` bare flag.
    pub tracking: bool,
    /// `--peak_threshold`.
    pub peak_threshold: f64,
    /// `--integral_refinement`.
    pub integral_refinement: IntegralRefinement,
    /// `--max_height`, omitted when unset.
    pub max_height: Option<u32>,
    /// `--max_width`, omitted when unset.
    pub max_width: Option<u32>,
    /// `--input_scale`, omitted when unset.
    pub input_scale: Option<f64>,
    /// `--ensure_rgb` bare flag.
    pub ensure_rgb: bool,
    /// `--ensure_grayscale` bare flag.
    pub ensure_grayscale: bool,
    /// `--crop_size`, omitted when unset.
    pub crop_size: Option<u32>,
    /// `--anchor_part`, omitted when empty.
    pub anchor_part: Option<String>,
    /// `--frames`, e.g. `0-100,200-300`, omitted when empty.
    pub frames: Option<String>,
    /// `--video_index`, omitted when unset.
    pub video_index: Option<u32>,
    /// `--tracking_window_size`.
    pub tracking_window_size: u32,
    /// `--max_tracks`, omitted when unset.
    pub max_tracks: Option<u32>,
    /// `--use_flow` bare flag.
    pub use_flow: bool,
    /// `--post_connect_single_breaks` bare flag.
    pub post_connect_single_breaks: bool,
}

impl Default for TrackerCliOptions {
    fn default() -> Self {
        Self {
            model_paths: Vec::new(),
            default_model: None,
            device: "auto".to_string(),
            batch_size: 4,
            max_instances: None,
            tracking: false,
            peak_threshold: 0.2,
            integral_refinement: IntegralRefinement::Integral,
            max_height: None,
            max_width: None,
            input_scale: None,
            ensure_rgb: false,
            ensure_grayscale: false,
            crop_size: None,
            anchor_part: None,
            frames: None,
            video_index: None,
            tracking_window_size: 5,
            max_tracks: None,
            use_flow: false,
            post_connect_single_breaks: false,
        }
    }
}

impl TrackerCliOptions {
    /// Assemble the argument list for one item.
    pub fn to_args(&self, data_path: &Path, output_path: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--data_path".into(),
            data_path.to_string_lossy().into_owned(),
            "--output_path".into(),
            output_path.to_string_lossy().into_owned(),
        ];

        if self.model_paths.is_empty() {
            if let Some(ref default) = self.default_model {
                args.push("--model_paths".into());
                args.push(default.to_string_lossy().into_owned());
            }
        } else {
            for model in &self.model_paths {
                args.push("--model_paths".into());
                args.push(model.to_string_lossy().into_owned());
            }
        }

        if !self.device.is_empty() {
            args.push("--device".into());
            args.push(self.device.clone());
        }
        args.push("--batch_size".into());
        args.push(self.batch_size.to_string());
        push_opt(&mut args, "--max_instances", self.max_instances);
        if self.tracking {
            args.push("--tracking".into());
        }
        args.push("--peak_threshold".into());
        args.push(self.peak_threshold.to_string());
        args.push("--integral_refinement".into());
        args.push(self.integral_refinement.as_str().into());

        push_opt(&mut args, "--max_height", self.max_height);
        push_opt(&mut args, "--max_width", self.max_width);
        if let Some(scale) = self.input_scale {
            args.push("--input_scale".into());
            args.push(scale.to_string());
        }
        if self.ensure_rgb {
            args.push("--ensure_rgb".into());
        }
        if self.ensure_grayscale {
            args.push("--ensure_grayscale".into());
        }
        push_opt(&mut args, "--crop_size", self.crop_size);
        push_text(&mut args, "--anchor_part", self.anchor_part.as_deref());
        push_text(&mut args, "--frames", self.frames.as_deref());
        push_opt(&mut args, "--video_index", self.video_index);

        args.push("--tracking_window_size".into());
        args.push(self.tracking_window_size.to_string());
        push_opt(&mut args, "--max_tracks", self.max_tracks);
        if self.use_flow {
            args.push("--use_flow".into());
        }
        if self.post_connect_single_breaks {
            args.push("--post_connect_single_breaks".into());
        }

        args
    }
}

fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<u32>) {
    if let Some(value) = value {
        args.push(flag.into());
        args.push(value.to_string());
    }
}

fn push_text(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            args.push(flag.into());
            args.push(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_and_output_paths_lead() {
        let args = TrackerCliOptions::default()
            .to_args(Path::new("/v/a.mp4"), Path::new("/p/a.mp4.predictions.slp"));
        assert_eq!(
            &args[..4],
            &[
                "--data_path",
                "/v/a.mp4",
                "--output_path",
                "/p/a.mp4.predictions.slp"
            ]
        );
    }

    #[test]
    fn defaults_emit_required_numerics_but_no_flags() {
        let args =
            TrackerCliOptions::default().to_args(Path::new("a.mp4"), Path::new("out.slp"));

        let pos = args.iter().position(|a| a == "--batch_size").unwrap();
        assert_eq!(args[pos + 1], "4");
        let pos = args.iter().position(|a| a == "--peak_threshold").unwrap();
        assert_eq!(args[pos + 1], "0.2");
        let pos = args
            .iter()
            .position(|a| a == "--integral_refinement")
            .unwrap();
        assert_eq!(args[pos + 1], "integral");

        assert!(!args.contains(&"--tracking".to_string()));
        assert!(!args.contains(&"--max_instances".to_string()));
        assert!(!args.contains(&"--use_flow".to_string()));
        assert!(!args.contains(&"--model_paths".to_string()));
    }

    #[test]
    fn booleans_emit_bare_flags_when_set() {
        let options = TrackerCliOptions {
            tracking: true,
            use_flow: true,
            ..TrackerCliOptions::default()
        };
        let args = options.to_args(Path::new("a.mp4"), Path::new("out.slp"));
        assert!(args.contains(&"--tracking".to_string()));
        assert!(args.contains(&"--use_flow".to_string()));
    }

    #[test]
    fn model_paths_repeat_per_value() {
        let options = TrackerCliOptions {
            model_paths: vec![PathBuf::from("/m/centroid"), PathBuf::from("/m/instance")],
            ..TrackerCliOptions::default()
        };
        let args = options.to_args(Path::new("a.mp4"), Path::new("out.slp"));
        let count = args.iter().filter(|a| *a == "--model_paths").count();
        assert_eq!(count, 2);
    }

    #[test]
    fn default_model_injected_only_when_none_configured() {
        let options = TrackerCliOptions {
            default_model: Some(PathBuf::from("/m/default")),
            ..TrackerCliOptions::default()
        };
        let args = options.to_args(Path::new("a.mp4"), Path::new("out.slp"));
        let pos = args.iter().position(|a| a == "--model_paths").unwrap();
        assert_eq!(args[pos + 1], "/m/default");

        let options = TrackerCliOptions {
            model_paths: vec![PathBuf::from("/m/explicit")],
            default_model: Some(PathBuf::from("/m/default")),
            ..TrackerCliOptions::default()
        };
        let args = options.to_args(Path::new("a.mp4"), Path::new("out.slp"));
        assert!(!args.contains(&"/m/default".to_string()));
        assert!(args.contains(&"/m/explicit".to_string()));
    }

    #[test]
    fn optional_values_appear_when_set() {
        let options = TrackerCliOptions {
            max_instances: Some(2),
            frames: Some("0-100,200-300".to_string()),
            input_scale: Some(0.5),
            ..TrackerCliOptions::default()
        };
        let args = options.to_args(Path::new("a.mp4"), Path::new("out.slp"));
        let pos = args.iter().position(|a| a == "--max_instances").unwrap();
        assert_eq!(args[pos + 1], "2");
        let pos = args.iter().position(|a| a == "--frames").unwrap();
        assert_eq!(args[pos + 1], "0-100,200-300");
        let pos = args.iter().position(|a| a == "--input_scale").unwrap();
        assert_eq!(args[pos + 1], "0.5");
    }

    #[test]
    fn options_roundtrip_through_json() {
        let options = TrackerCliOptions {
            tracking: true,
            max_tracks: Some(3),
            integral_refinement: IntegralRefinement::None,
            ..TrackerCliOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: TrackerCliOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }
}
