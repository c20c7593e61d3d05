//! Core library for extracting invoice tables from scanned PDFs.
//!
//! This crate provides:
//! - PDF rasterization (poppler `pdftoppm` or embedded scan images)
//! - Text recognition (Tesseract, or a pure Rust ONNX engine)
//! - Row parsing against the fixed Item/Description/NCM/Unit/Quantity/R1/R2/Amount layout
//! - CSV output of the collected rows

pub mod error;
pub mod models;
pub mod ocr;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod table;

pub use error::{ExtractionError, InvtabError, OcrError, OutputError, PdfError, Result};
pub use models::config::InvtabConfig;
pub use models::row::{Extraction, PageSummary, TableRow};
pub use ocr::{TesseractRecognizer, TextRecognizer};
#[cfg(feature = "onnx")]
pub use ocr::OnnxRecognizer;
pub use output::{output_path_for, write_table, COLUMNS};
pub use pdf::{EmbeddedImageRasterizer, PageImage, PopplerRasterizer, Rasterizer};
pub use pipeline::{extract_to_csv, extract_to_file, DocumentProcessor, PageEvent};
pub use table::{parse_line, parse_lines, RowCollector, RowParser};
