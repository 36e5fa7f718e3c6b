//! Format rule table and conversion strategy resolution.

use thiserror::Error;

/// Video container extensions handled by ffmpeg directly.
const VIDEO_EXTS: &[&str] = &["mp4", "avi", "mov", "mkv"];

/// Still image extensions.
const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "tiff", "bmp"];

/// Tool chain used to realize one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Single ffmpeg invocation from source to target.
    DirectFfmpeg,
    /// Stage a scrub-friendly intra-frame intermediate, then trim clips.
    StageThenTrim,
    /// Image format change via ffmpeg.
    ImageConvert,
    /// Image wrapped into a single-page PDF via ImageMagick.
    ImageToPdf,
    /// One image per PDF page via pdftoppm.
    PdfToImage,
    /// Document conversion via pandoc.
    PandocDoc,
    /// DOCX to PDF needs Microsoft Word; reported unavailable here.
    DocxToPdfWord,
}

impl Strategy {
    /// Stable identifier used in logs and task reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::DirectFfmpeg => "direct-ffmpeg",
            Strategy::StageThenTrim => "stage-then-trim",
            Strategy::ImageConvert => "image-convert",
            Strategy::ImageToPdf => "image-to-pdf",
            Strategy::PdfToImage => "pdf-to-image",
            Strategy::PandocDoc => "pandoc-doc",
            Strategy::DocxToPdfWord => "docx-to-pdf-word",
        }
    }
}

/// A conversion pair with no usable strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported conversion from .{input} to .{output}")]
    UnsupportedConversion { input: String, output: String },
}

/// One row of the format table: an input extension class and its
/// ordered list of allowed output extensions.
#[derive(Debug, Clone)]
pub struct FormatRule {
    /// Input extensions this rule covers (normalized, no dot).
    pub inputs: Vec<String>,
    /// Allowed outputs, in menu order.
    pub outputs: Vec<String>,
}

impl FormatRule {
    fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Immutable table of format rules, loaded once and passed around.
#[derive(Debug, Clone)]
pub struct FormatTable {
    rules: Vec<FormatRule>,
}

impl FormatTable {
    /// Build a table from explicit rules.
    pub fn new(rules: Vec<FormatRule>) -> Self {
        Self { rules }
    }

    /// The standard rule set.
    pub fn standard() -> Self {
        Self::new(vec![
            FormatRule::new(&["seq"], &["mp4", "avi"]),
            FormatRule::new(VIDEO_EXTS, &["mp4", "avi", "mov", "mkv", "gif"]),
            FormatRule::new(IMAGE_EXTS, &["jpg", "png", "tiff", "bmp", "pdf"]),
            FormatRule::new(&["pdf"], &["jpg", "png", "docx", "txt"]),
            FormatRule::new(&["docx"], &["pdf", "txt"]),
            FormatRule::new(&["txt"], &["pdf", "docx"]),
        ])
    }

    /// Allowed outputs for an input extension, in menu order.
    pub fn allowed_outputs(&self, input_ext: &str) -> Vec<String> {
        let ext = normalize_ext(input_ext);
        self.rules
            .iter()
            .find(|r| r.inputs.iter().any(|i| *i == ext))
            .map(|r| r.outputs.clone())
            .unwrap_or_default()
    }
}

/// Resolves conversion strategies against a fixed [`FormatTable`].
#[derive(Debug, Clone)]
pub struct FormatResolver {
    table: FormatTable,
}

impl FormatResolver {
    /// Create a resolver over an explicit table.
    pub fn new(table: FormatTable) -> Self {
        Self { table }
    }

    /// Create a resolver over the standard table.
    pub fn standard() -> Self {
        Self::new(FormatTable::standard())
    }

    /// Allowed outputs for an input extension.
    pub fn allowed_outputs(&self, input_ext: &str) -> Vec<String> {
        self.table.allowed_outputs(input_ext)
    }

    /// Pick the strategy for an input/output pair.
    ///
    /// `clip` selects the staged intermediate path for video inputs so
    /// that clip boundaries can be seeked frame-accurately. Pairs not
    /// covered by any rule fall back to a direct ffmpeg run when both
    /// sides look like media, otherwise the conversion is unsupported.
    pub fn strategy_for(
        &self,
        input_ext: &str,
        output_ext: &str,
        clip: bool,
    ) -> Result<Strategy, FormatError> {
        let input = normalize_ext(input_ext);
        let output = normalize_ext(output_ext);

        let video_in = VIDEO_EXTS.contains(&input.as_str());
        let video_out = VIDEO_EXTS.contains(&output.as_str()) || output == "gif";
        let image_in = IMAGE_EXTS.contains(&input.as_str());
        let image_out = IMAGE_EXTS.contains(&output.as_str());

        if input == "seq" && (output == "mp4" || output == "avi") {
            return Ok(if clip {
                Strategy::StageThenTrim
            } else {
                Strategy::DirectFfmpeg
            });
        }
        if video_in && video_out {
            return Ok(if clip {
                Strategy::StageThenTrim
            } else {
                Strategy::DirectFfmpeg
            });
        }
        if image_in && image_out {
            return Ok(Strategy::ImageConvert);
        }
        if image_in && output == "pdf" {
            return Ok(Strategy::ImageToPdf);
        }
        if input == "pdf" {
            if image_out {
                return Ok(Strategy::PdfToImage);
            }
            if output == "docx" || output == "txt" {
                return Ok(Strategy::PandocDoc);
            }
        }
        if input == "docx" {
            if output == "pdf" {
                return Ok(Strategy::DocxToPdfWord);
            }
            if output == "txt" {
                return Ok(Strategy::PandocDoc);
            }
        }
        if input == "txt" && (output == "pdf" || output == "docx") {
            return Ok(Strategy::PandocDoc);
        }

        // Uncovered pair: ffmpeg handles anything media-to-media.
        if media_like(&input) && media_like(&output) {
            return Ok(Strategy::DirectFfmpeg);
        }

        Err(FormatError::UnsupportedConversion { input, output })
    }
}

fn media_like(ext: &str) -> bool {
    VIDEO_EXTS.contains(&ext)
        || IMAGE_EXTS.contains(&ext)
        || ext == "gif"
        || ext == "seq"
}

/// Normalize an extension: strip a leading dot, lowercase.
pub fn normalize_ext(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
