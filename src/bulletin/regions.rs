//! Region extraction for one page, per region strategy.

use image::RgbaImage;

use super::dynamic::DynamicRegionResolver;
use crate::layout::{scale_rect, BulletinLayout, PageLayout, RegionStrategy, ScaleFactors};
use crate::log;
use crate::ocr::{ocr_region, MultiConfigOcr, OcrResult};

/// Texts extracted from one page.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub results: Vec<OcrResult>,
    /// Regions deliberately not extracted, with the reason
    pub skipped: Vec<(String, String)>,
}

pub struct RegionExtractor<'a> {
    layout: &'a BulletinLayout,
    ocr: MultiConfigOcr<'a>,
    resolver: DynamicRegionResolver<'a>,
}

impl<'a> RegionExtractor<'a> {
    pub fn new(
        layout: &'a BulletinLayout,
        ocr: MultiConfigOcr<'a>,
        resolver: DynamicRegionResolver<'a>,
    ) -> Self {
        Self {
            layout,
            ocr,
            resolver,
        }
    }

    /// Extracts every region of `page` from `img`, in configuration order.
    pub fn extract_page(&self, page: &PageLayout, img: &RgbaImage, factors: ScaleFactors) -> PageExtraction {
        let mut extraction = PageExtraction::default();

        for roi in &page.rois {
            let region = scale_rect(self.layout.padded(roi), factors);
            extraction
                .results
                .push(ocr_region(&self.ocr, img, &region, &roi.name));
        }

        match &page.strategy {
            RegionStrategy::Static => {}
            RegionStrategy::FlowBelow(flow) => {
                let Some(anchor) = page.roi(&flow.anchor_roi) else {
                    let reason = format!("anchor ROI '{}' is not configured", flow.anchor_roi);
                    log(&format!("  > Skipping '{}': {}", flow.name, reason));
                    extraction.skipped.push((flow.name.clone(), reason));
                    return extraction;
                };
                // Text end is measured on the nominal ROI, without padding
                let anchor_region = scale_rect(anchor.coords, factors);

                match self.resolver.resolve(img, &anchor_region, flow, factors) {
                    Ok(region) => extraction
                        .results
                        .push(ocr_region(&self.ocr, img, &region, &flow.name)),
                    Err(e) => {
                        log(&format!("  > Skipping '{}': {}", flow.name, e));
                        extraction.skipped.push((flow.name.clone(), e.to_string()));
                    }
                }
            }
        }

        extraction
    }
}
