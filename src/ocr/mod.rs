pub mod anchor;
pub mod engine;
pub mod multi;
pub mod preprocess;
pub mod setup;
#[cfg(test)]
pub mod testing;

pub use anchor::AnchorLocator;
pub use engine::{OcrBackend, TesseractCli};
pub use multi::{MultiConfigOcr, OcrResult};
pub use preprocess::{crop_region, preprocess_for_ocr};
pub use setup::ensure_tesseract;

use image::RgbaImage;

use crate::layout::PixelRect;

/// High-level function: page image + pixel region → labeled text.
///
/// Crops the region (clipped to the page), preprocesses it and runs the
/// profile set. An empty crop yields the failure placeholder.
pub fn ocr_region(ocr: &MultiConfigOcr<'_>, img: &RgbaImage, region: &PixelRect, name: &str) -> OcrResult {
    match crop_region(img, region) {
        Some(cropped) => {
            crate::log(&format!(
                "  > OCR '{}': x={} y={} w={} h={}",
                name, region.x, region.y, region.width, region.height
            ));
            let preprocessed = preprocess_for_ocr(&cropped);
            ocr.extract(&preprocessed, name)
        }
        None => {
            crate::log(&format!("  > OCR '{}': region lies outside the page", name));
            OcrResult::failed(name)
        }
    }
}
