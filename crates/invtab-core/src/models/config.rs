//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the invtab pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvtabConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// Output table configuration.
    pub output: OutputConfig,
}

/// Which OCR engine recognizes page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// The `tesseract` command line tool.
    #[default]
    Tesseract,
    /// Pure Rust ONNX engine (requires the `onnx` feature).
    Onnx,
}

/// How PDF pages become images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterBackend {
    /// Render pages with poppler's `pdftoppm`.
    #[default]
    Poppler,
    /// Take the scan image embedded in each page.
    Embedded,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Engine used for recognition.
    pub engine: OcrEngineKind,

    /// Recognition language (Tesseract language code).
    pub language: String,

    /// Tesseract executable.
    pub tesseract_cmd: String,

    /// Tesseract page segmentation mode.
    pub psm: Option<u8>,

    /// Directory with ONNX models (det.onnx, latin_rec.onnx, latin_dict.txt).
    pub model_dir: PathBuf,

    /// Number of pages recognized in parallel.
    pub jobs: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::Tesseract,
            language: "por".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            psm: None,
            model_dir: PathBuf::from("models"),
            jobs: 1,
        }
    }
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Backend used to produce page images.
    pub backend: RasterBackend,

    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// pdftoppm executable.
    pub pdftoppm_cmd: String,

    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            backend: RasterBackend::Poppler,
            render_dpi: 200,
            pdftoppm_cmd: "pdftoppm".to_string(),
            max_pages: 0,
        }
    }
}

/// Output table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the input file stem to name the CSV.
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: crate::output::DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl InvtabConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = InvtabConfig::default();
        assert_eq!(config.ocr.language, "por");
        assert_eq!(config.ocr.engine, OcrEngineKind::Tesseract);
        assert_eq!(config.ocr.jobs, 1);
        assert_eq!(config.pdf.backend, RasterBackend::Poppler);
        assert_eq!(config.pdf.render_dpi, 200);
        assert_eq!(config.output.suffix, "_ocr_result");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ocr": { "language": "eng", "jobs": 4 }, "pdf": { "backend": "embedded" } }"#)
            .unwrap();

        let config = InvtabConfig::from_file(&path).unwrap();
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.jobs, 4);
        assert_eq!(config.ocr.tesseract_cmd, "tesseract");
        assert_eq!(config.pdf.backend, RasterBackend::Embedded);
        assert_eq!(config.pdf.render_dpi, 200);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvtabConfig::default();
        config.ocr.psm = Some(6);
        config.save(&path).unwrap();

        let loaded = InvtabConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.psm, Some(6));
    }

    #[test]
    fn test_invalid_json_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = InvtabConfig::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
