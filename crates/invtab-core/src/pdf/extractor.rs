//! Page images taken from the scans embedded in a PDF, using lopdf.

use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, trace, warn};

use super::{limit_pages, PageImage, Rasterizer, Result};
use crate::error::PdfError;

/// Rasterizer for scanned PDFs that embed one image per page.
///
/// Nothing is rendered: for each page the largest decodable image XObject is
/// used as the page raster. Supports JPEG (`DCTDecode`) and raw 8-bit
/// `DeviceRGB`/`DeviceGray` data. Pages without such an image are skipped.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedImageRasterizer {
    max_pages: usize,
}

impl EmbeddedImageRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process at most `max_pages` pages (0 = all).
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Extract page images from PDF bytes.
    pub fn rasterize_bytes(&self, data: &[u8]) -> Result<Vec<PageImage>> {
        let doc = load_document(data)?;

        let mut pages = Vec::new();
        for (number, page_id) in doc.get_pages() {
            if self.max_pages > 0 && pages.len() >= self.max_pages {
                break;
            }

            let images = page_images(&doc, page_id);
            let largest = images.into_iter().max_by_key(|img| {
                let (w, h) = img.dimensions();
                u64::from(w) * u64::from(h)
            });

            match largest {
                Some(image) => pages.push(PageImage { number, image }),
                None => warn!("Page {} has no decodable embedded image, skipping", number),
            }
        }

        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        info!("Extracted {} page images", pages.len());
        Ok(limit_pages(pages, self.max_pages))
    }
}

impl Rasterizer for EmbeddedImageRasterizer {
    fn rasterize(&self, path: &Path) -> Result<Vec<PageImage>> {
        let data = std::fs::read(path)?;
        self.rasterize_bytes(&data)
    }
}

fn load_document(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    // Handle PDFs with empty password encryption
    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(PdfError::NoPages);
    }

    debug!("Loaded PDF with {} pages", page_count);
    Ok(doc)
}

/// Decodable image XObjects referenced by a page.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let mut images = Vec::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return images;
    };

    if let Ok(xobjects) = resources.get(b"XObject") {
        if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
            for (_name, obj_ref) in xobj_dict.iter() {
                if let Ok((_, obj)) = doc.dereference(obj_ref) {
                    if let Some(img) = decode_image_object(doc, obj) {
                        images.push(img);
                    }
                }
            }
        }
    }

    trace!("Page object {:?}: {} images", page_id, images.len());
    images
}

/// Resources dictionary for a page, following `Parent` inheritance.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) if !arr.is_empty() => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                // JPEG data is used as stored
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    image_from_raw(&data, width, height, color_space, bits)
}

fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = (width as usize) * (height as usize);
    let channels = match color_space {
        b"DeviceRGB" | b"RGB" => 3,
        b"DeviceGray" | b"G" => 1,
        _ => {
            trace!("Unsupported color space {:?}", String::from_utf8_lossy(color_space));
            return None;
        }
    };

    if data.len() < pixels * channels {
        trace!("Image data too short: {} < {}", data.len(), pixels * channels);
        return None;
    }

    let mut rgba = Vec::with_capacity(pixels * 4);
    for px in data[..pixels * channels].chunks_exact(channels) {
        match px {
            [r, g, b] => rgba.extend_from_slice(&[*r, *g, *b, 255]),
            [gray] => rgba.extend_from_slice(&[*gray, *gray, *gray, 255]),
            _ => unreachable!("chunks_exact yields {} bytes", channels),
        }
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};
    use pretty_assertions::assert_eq;

    /// Build a PDF whose pages each carry one raw gray image of the given size.
    /// `None` produces a page without images.
    fn pdf_with_images(sizes: &[Option<(u32, u32)>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for size in sizes {
            let resources = match size {
                Some((w, h)) => {
                    let pixels = vec![128u8; (*w * *h) as usize];
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => *w as i64,
                            "Height" => *h as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        pixels,
                    ));
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } }
                }
                None => Dictionary::new(),
            };

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extracts_one_image_per_page() {
        let pdf = pdf_with_images(&[Some((4, 3)), Some((2, 2))]);
        let pages = EmbeddedImageRasterizer::new().rasterize_bytes(&pdf).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].image.dimensions(), (4, 3));
        assert_eq!(pages[1].number, 2);
        assert_eq!(pages[1].image.dimensions(), (2, 2));
    }

    #[test]
    fn test_skips_pages_without_images() {
        let pdf = pdf_with_images(&[None, Some((2, 2))]);
        let pages = EmbeddedImageRasterizer::new().rasterize_bytes(&pdf).unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 2);
    }

    #[test]
    fn test_no_images_is_no_pages() {
        let pdf = pdf_with_images(&[None]);
        assert!(matches!(
            EmbeddedImageRasterizer::new().rasterize_bytes(&pdf),
            Err(PdfError::NoPages)
        ));
    }

    #[test]
    fn test_max_pages() {
        let pdf = pdf_with_images(&[Some((1, 1)), Some((1, 1)), Some((1, 1))]);
        let pages = EmbeddedImageRasterizer::new()
            .with_max_pages(2)
            .rasterize_bytes(&pdf)
            .unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_invalid_pdf() {
        assert!(matches!(
            EmbeddedImageRasterizer::new().rasterize_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_image_from_raw() {
        let rgb = [255u8, 0, 0, 0, 255, 0];
        let img = image_from_raw(&rgb, 2, 1, b"DeviceRGB", 8).unwrap();
        assert_eq!(img.to_rgba8().get_pixel(1, 0).0, [0, 255, 0, 255]);

        assert!(image_from_raw(&rgb, 2, 1, b"DeviceRGB", 1).is_none());
        assert!(image_from_raw(&rgb, 4, 4, b"DeviceGray", 8).is_none());
        assert!(image_from_raw(&rgb, 1, 1, b"DeviceCMYK", 8).is_none());
    }
}
