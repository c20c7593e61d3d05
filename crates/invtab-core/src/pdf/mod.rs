//! PDF rasterization.

mod extractor;
mod poppler;

pub use extractor::EmbeddedImageRasterizer;
pub use poppler::PopplerRasterizer;

use std::path::Path;

use image::DynamicImage;

use crate::error::PdfError;
use crate::models::config::{PdfConfig, RasterBackend};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// One rendered page.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Page raster.
    pub image: DynamicImage,
}

/// Turns a document into page images.
pub trait Rasterizer: Send + Sync {
    /// Render every page of the document at `path`, in page order.
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>>;
}

impl<T: Rasterizer + ?Sized> Rasterizer for Box<T> {
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>> {
        (**self).rasterize(path)
    }
}

/// Build the rasterizer selected in the configuration.
pub fn rasterizer_from_config(config: &PdfConfig) -> Box<dyn Rasterizer> {
    match config.backend {
        RasterBackend::Poppler => Box::new(PopplerRasterizer::from_config(config)),
        RasterBackend::Embedded => {
            Box::new(EmbeddedImageRasterizer::new().with_max_pages(config.max_pages))
        }
    }
}

/// Keep at most `max_pages` pages (0 = all).
fn limit_pages(mut pages: Vec<PageImage>, max_pages: usize) -> Vec<PageImage> {
    if max_pages > 0 && pages.len() > max_pages {
        pages.truncate(max_pages);
    }
    pages
}
