//! Page rendering with poppler's `pdftoppm`.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::{limit_pages, PageImage, Rasterizer, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Rasterizer that renders every page to PNG with `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    program: OsString,
    dpi: u32,
    max_pages: usize,
}

impl PopplerRasterizer {
    /// Create a rasterizer using `pdftoppm` from `PATH` at 200 DPI.
    pub fn new() -> Self {
        Self {
            program: OsString::from("pdftoppm"),
            dpi: 200,
            max_pages: 0,
        }
    }

    /// Create a rasterizer from the PDF configuration.
    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new()
            .with_program(&config.pdftoppm_cmd)
            .with_dpi(config.render_dpi)
            .with_max_pages(config.max_pages)
    }

    /// Use a different `pdftoppm` executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Render at most `max_pages` pages (0 = all).
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn args(&self, pdf_path: &Path, prefix: &Path) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-png"),
            OsString::from("-r"),
            OsString::from(self.dpi.to_string()),
        ];
        if self.max_pages > 0 {
            args.push(OsString::from("-l"));
            args.push(OsString::from(self.max_pages.to_string()));
        }
        args.push(pdf_path.as_os_str().to_os_string());
        args.push(prefix.as_os_str().to_os_string());
        args
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PopplerRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>> {
        let temp_dir = tempfile::tempdir()?;
        let prefix = temp_dir.path().join("page");

        debug!("Rendering {} at {} DPI", path.display(), self.dpi);

        let output = Command::new(&self.program)
            .args(self.args(path, &prefix))
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PdfError::Backend(format!(
                    "{} not found: {}. Make sure poppler-utils is installed.",
                    self.program.to_string_lossy(),
                    e
                )),
                _ => PdfError::Render(format!(
                    "failed to run {}: {}",
                    self.program.to_string_lossy(),
                    e
                )),
            })?;

        if !output.status.success() {
            return Err(PdfError::Render(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let rendered = rendered_pages(temp_dir.path())?;
        if rendered.is_empty() {
            return Err(PdfError::NoPages);
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (number, image_path) in rendered {
            let image = image::open(&image_path)
                .map_err(|e| PdfError::Render(format!("{}: {}", image_path.display(), e)))?;
            pages.push(PageImage { number, image });
        }

        info!("Rendered {} pages from {}", pages.len(), path.display());
        Ok(limit_pages(pages, self.max_pages))
    }
}

/// List `<prefix>-<n>.png` files in `dir`, sorted by page number.
///
/// pdftoppm zero-pads the page number to the width of the page count, so the
/// number is parsed rather than relying on name order.
fn rendered_pages(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages)
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}
