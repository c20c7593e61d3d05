//! Error types for the invtab-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invtab library.
#[derive(Error, Debug)]
pub enum InvtabError {
    /// The input document does not exist.
    #[error("input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    /// PDF rasterization error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Table extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Failed to write the output table.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvtabError {
    /// Likely causes for failures of the external collaborators.
    ///
    /// Empty for errors that already say everything there is to say.
    pub fn hints(&self) -> &'static [&'static str] {
        match self {
            InvtabError::Pdf(_) => &[
                "Is poppler (pdftoppm) installed and on PATH?",
                "Is the file a readable, unencrypted PDF?",
            ],
            InvtabError::Ocr(OcrError::EngineUnavailable(_)) => {
                &["Is Tesseract installed and on PATH?"]
            }
            InvtabError::Ocr(_) => &[
                "Is Tesseract installed and on PATH?",
                "Is the language pack for the configured language installed (e.g. tesseract-ocr-por)?",
            ],
            InvtabError::Extraction(ExtractionError::NoRows) => &[
                "Check the scan quality of the PDF.",
                "Check that the table uses the Item/Description/NCM/Unit/Quantity/R1/R2/Amount layout.",
            ],
            _ => &[],
        }
    }
}

/// Errors related to turning a PDF into page images.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The rasterization backend could not be started.
    #[error("rasterizer unavailable: {0}")]
    Backend(String),

    /// The rasterization backend ran but failed.
    #[error("failed to render pages: {0}")]
    Render(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no renderable pages.
    #[error("PDF has no pages")]
    NoPages,

    /// I/O error around temporary files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The OCR engine could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to table row extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// No line of the document matched the row layout.
    #[error("no rows extracted")]
    NoRows,
}

/// Errors related to writing the output table.
#[derive(Error, Debug)]
pub enum OutputError {
    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input path has no file name to derive the output from.
    #[error("cannot derive output path from {}", .0.display())]
    InvalidPath(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the invtab library.
pub type Result<T> = std::result::Result<T, InvtabError>;
