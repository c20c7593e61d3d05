//! Data models and configuration.

pub mod config;
pub mod row;

pub use config::{InvtabConfig, OcrConfig, OcrEngineKind, OutputConfig, PdfConfig, RasterBackend};
pub use row::{Extraction, PageSummary, TableRow};
