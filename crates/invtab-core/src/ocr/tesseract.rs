//! Text recognition through the `tesseract` command line tool.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use std::time::Instant;

use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{Result, TextRecognizer};

/// Recognizer that shells out to Tesseract.
///
/// Each page is written to a temporary PNG which is removed once the run
/// finishes. Tesseract is invoked once per page, without retries.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: OsString,
    psm: Option<u8>,
}

impl TesseractRecognizer {
    /// Create a recognizer using `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: OsString::from("tesseract"),
            psm: None,
        }
    }

    /// Create a recognizer from the OCR configuration.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new()
            .with_program(&config.tesseract_cmd)
            .with_psm(config.psm)
    }

    /// Use a different Tesseract executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the page segmentation mode.
    pub fn with_psm(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }

    fn args(&self, image_path: &Path, language: &str) -> Vec<OsString> {
        let mut args = vec![
            image_path.as_os_str().to_os_string(),
            OsString::from("stdout"),
            OsString::from("-l"),
            OsString::from(language),
        ];
        if let Some(psm) = self.psm {
            args.push(OsString::from("--psm"));
            args.push(OsString::from(psm.to_string()));
        }
        args
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("{}x{}", width, height)));
        }

        let input = tempfile::Builder::new()
            .prefix("invtab-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Recognition(format!("failed to create temp file: {}", e)))?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        debug!("Running {:?} on {}x{} image (lang={})", self.program, width, height, language);

        let output = Command::new(&self.program)
            .args(self.args(input.path(), language))
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::EngineUnavailable(format!(
                    "{} not found: {}",
                    self.program.to_string_lossy(),
                    e
                )),
                _ => OcrError::Recognition(format!(
                    "failed to run {}: {}",
                    self.program.to_string_lossy(),
                    e
                )),
            })?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();

        info!(
            "OCR complete: {} chars in {}ms",
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}
