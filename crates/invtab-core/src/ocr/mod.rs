//! Text recognition for rendered pages.

#[cfg(feature = "onnx")]
mod pure_engine;
mod tesseract;

#[cfg(feature = "onnx")]
pub use pure_engine::OnnxRecognizer;
pub use tesseract::TesseractRecognizer;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrEngineKind};

/// Result type for OCR operations.
pub type Result<T> = std::result::Result<T, OcrError>;

/// Turns one page image into plain text with line breaks.
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text of `image` using the `language` hint.
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String>;
}

impl<T: TextRecognizer + ?Sized> TextRecognizer for Box<T> {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String> {
        (**self).recognize(image, language)
    }
}

/// Build the recognizer selected in the configuration.
pub fn recognizer_from_config(config: &OcrConfig) -> Result<Box<dyn TextRecognizer>> {
    match config.engine {
        OcrEngineKind::Tesseract => Ok(Box::new(TesseractRecognizer::from_config(config))),
        #[cfg(feature = "onnx")]
        OcrEngineKind::Onnx => Ok(Box::new(OnnxRecognizer::from_dir(&config.model_dir)?)),
        #[cfg(not(feature = "onnx"))]
        OcrEngineKind::Onnx => Err(OcrError::EngineUnavailable(
            "built without ONNX support (enable the `onnx` feature)".to_string(),
        )),
    }
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    fn center_y(&self) -> f32 {
        let (_, min_y, _, max_y) = self.rect();
        (min_y + max_y) / 2.0
    }

    fn height(&self) -> f32 {
        let (_, min_y, _, max_y) = self.rect();
        max_y - min_y
    }
}

/// Assemble word/phrase boxes into text lines.
///
/// Boxes whose vertical centres lie within half a box height of a line's
/// centre join that line. Lines are emitted top to bottom, boxes within a
/// line left to right, separated by one space.
pub fn assemble_lines(boxes: &[TextBox]) -> String {
    let mut sorted: Vec<&TextBox> = boxes.iter().filter(|b| !b.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

    // (centre y, height, boxes)
    let mut lines: Vec<(f32, f32, Vec<&TextBox>)> = Vec::new();
    for text_box in sorted {
        let cy = text_box.center_y();
        let h = text_box.height();

        match lines.last_mut() {
            Some((line_cy, line_h, members)) if (cy - *line_cy).abs() <= line_h.max(h) / 2.0 => {
                members.push(text_box);
                let n = members.len() as f32;
                *line_cy += (cy - *line_cy) / n;
                *line_h = line_h.max(h);
            }
            _ => lines.push((cy, h, vec![text_box])),
        }
    }

    lines
        .into_iter()
        .map(|(_, _, mut members)| {
            members.sort_by(|a, b| a.rect().0.total_cmp(&b.rect().0));
            members
                .iter()
                .map(|b| b.text.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
