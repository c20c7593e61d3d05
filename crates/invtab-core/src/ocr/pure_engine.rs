//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;

use super::{assemble_lines, Result, TextBox, TextRecognizer};

/// Recognizer backed by `pure-onnx-ocr` (pure Rust, no external binaries).
///
/// The bundled latin model does not take a language hint; the hint passed to
/// [`TextRecognizer::recognize`] is ignored.
pub struct OnnxRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl OnnxRecognizer {
    /// Create an engine from model files in a directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing {}", path.display())));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }
}

impl TextRecognizer for OnnxRecognizer {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        debug!("Processing image: {}x{} (language hint {} ignored)", width, height, language);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let boxes: Vec<TextBox> = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: r.text.replace("[UNK]", " "),
                confidence: r.confidence,
            })
            .collect();

        let text = assemble_lines(&boxes);

        info!(
            "OCR complete: {} text boxes in {}ms",
            boxes.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
