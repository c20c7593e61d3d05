//! Pipeline options shared by the extract and batch commands.

use std::path::PathBuf;

use clap::Args;

use invtab_core::models::config::{InvtabConfig, OcrEngineKind, RasterBackend};

/// OCR and rasterization overrides. Unset flags keep the configured value.
#[derive(Args, Debug, Default)]
pub struct PipelineOptions {
    /// Recognition language (Tesseract language code)
    #[arg(short, long)]
    lang: Option<String>,

    /// Page rasterization backend
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// OCR engine
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Render resolution in DPI
    #[arg(long)]
    dpi: Option<u32>,

    /// Tesseract page segmentation mode
    #[arg(long)]
    psm: Option<u8>,

    /// Maximum pages to process (0 = all)
    #[arg(long)]
    max_pages: Option<usize>,

    /// Number of pages recognized in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Model directory for the ONNX engine
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum BackendArg {
    /// Render pages with pdftoppm
    Poppler,
    /// Use the scan image embedded in each page
    Embedded,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum EngineArg {
    /// Tesseract command line tool
    Tesseract,
    /// Pure Rust ONNX engine
    Onnx,
}

impl PipelineOptions {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut InvtabConfig) {
        if let Some(lang) = &self.lang {
            config.ocr.language = lang.clone();
        }
        if let Some(backend) = self.backend {
            config.pdf.backend = match backend {
                BackendArg::Poppler => RasterBackend::Poppler,
                BackendArg::Embedded => RasterBackend::Embedded,
            };
        }
        if let Some(engine) = self.engine {
            config.ocr.engine = match engine {
                EngineArg::Tesseract => OcrEngineKind::Tesseract,
                EngineArg::Onnx => OcrEngineKind::Onnx,
            };
        }
        if let Some(dpi) = self.dpi {
            config.pdf.render_dpi = dpi;
        }
        if self.psm.is_some() {
            config.ocr.psm = self.psm;
        }
        if let Some(max_pages) = self.max_pages {
            config.pdf.max_pages = max_pages;
        }
        if let Some(jobs) = self.jobs {
            config.ocr.jobs = jobs;
        }
        if let Some(model_dir) = &self.model_dir {
            config.ocr.model_dir = model_dir.clone();
        }
    }
}
