//! Content-dependent region placement.
//!
//! A flow-below region starts where the text of its anchor ROI ends and runs
//! to the bottom of the page, so a long scripture passage pushes the notes
//! section down instead of being cut off.

use anyhow::Result;
use image::RgbaImage;

use crate::error::ExtractionError;
use crate::layout::{FlowBelowRegion, PixelRect, ScaleFactors};
use crate::log;
use crate::ocr::{crop_region, preprocess_for_ocr, AnchorLocator};

/// Outcome of the text-end search over the anchor region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEnd {
    /// Bottom edge of the lowest recognized word
    Found(u32),
    /// Recognition ran but returned no words
    Blank,
    /// Recognition failed, or the anchor region lies off the page
    Unknown,
}

impl TextEnd {
    /// y-coordinate the anchor margin is added to.
    ///
    /// A blank anchor region hands the whole page below its top to the flow
    /// region; a failed search falls back to the anchor region's bottom edge.
    pub fn boundary(self, anchor_region: &PixelRect) -> u32 {
        match self {
            TextEnd::Found(y) => y.max(anchor_region.y),
            TextEnd::Blank => anchor_region.y,
            TextEnd::Unknown => anchor_region.bottom(),
        }
    }
}

/// Where a flow region's printed label was recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelPosition {
    pub label: String,
    /// Top edge of the first word matching the label text
    pub top: Option<u32>,
    /// Bottom edge of the first word containing one of the label keywords
    pub bottom: Option<u32>,
}

pub struct DynamicRegionResolver<'a> {
    locator: AnchorLocator<'a>,
}

impl<'a> DynamicRegionResolver<'a> {
    pub fn new(locator: AnchorLocator<'a>) -> Self {
        Self { locator }
    }

    /// Computes the pixel region for `flow` on this page.
    ///
    /// `anchor_region` is the already scaled ROI whose text end marks the top
    /// of the flow region.
    pub fn resolve(
        &self,
        img: &RgbaImage,
        anchor_region: &PixelRect,
        flow: &FlowBelowRegion,
        factors: ScaleFactors,
    ) -> Result<PixelRect, ExtractionError> {
        let text_end = self.text_end(img, anchor_region, flow);
        let (width, height) = img.dimensions();
        flow_region_below(text_end, anchor_region, flow, factors, width, height)
    }

    fn text_end(&self, img: &RgbaImage, anchor_region: &PixelRect, flow: &FlowBelowRegion) -> TextEnd {
        let Some(cropped) = crop_region(img, anchor_region) else {
            log(&format!("  > '{}': anchor region lies outside the page", flow.anchor_roi));
            return TextEnd::Unknown;
        };
        let preprocessed = preprocess_for_ocr(&cropped);

        match self.locator.find_last_text_bottom(&preprocessed, anchor_region) {
            Ok(Some(y)) => TextEnd::Found(y),
            Ok(None) => {
                log(&format!(
                    "  > {}; using region top",
                    ExtractionError::AnchorNotFound(flow.anchor_roi.clone())
                ));
                TextEnd::Blank
            }
            Err(e) => {
                log(&format!(
                    "  > {} ({}); using region bottom",
                    ExtractionError::AnchorNotFound(flow.anchor_roi.clone()),
                    e
                ));
                TextEnd::Unknown
            }
        }
    }

    /// Searches the flow column, from the anchor region's top to the page
    /// bottom, for the flow region's printed label.
    ///
    /// Returns `None` when the layout names no label or the column lies off
    /// the page.
    pub fn locate_label(
        &self,
        img: &RgbaImage,
        anchor_region: &PixelRect,
        flow: &FlowBelowRegion,
        factors: ScaleFactors,
    ) -> Result<Option<LabelPosition>> {
        let Some(label) = flow.label.as_deref() else {
            return Ok(None);
        };
        let (width, height) = img.dimensions();
        let column = PixelRect::new(
            factors.scale_x(flow.x),
            anchor_region.y,
            factors.scale_x(flow.width),
            height.saturating_sub(anchor_region.y),
        );
        let Some(column) = column.clip_to(width, height) else {
            return Ok(None);
        };
        let Some(cropped) = crop_region(img, &column) else {
            return Ok(None);
        };
        let preprocessed = preprocess_for_ocr(&cropped);

        let keywords: Vec<&str> = flow.label_keywords.iter().map(String::as_str).collect();
        Ok(Some(LabelPosition {
            label: label.to_string(),
            top: self.locator.find_text_top(&preprocessed, label, &column)?,
            bottom: self.locator.find_label_bottom(&preprocessed, &keywords, &column)?,
        }))
    }
}

/// Places the flow region below the anchor region's text.
///
/// The top edge never comes closer than `start_clamp` to the page bottom,
/// the bottom edge stays `bottom_margin` above it, and regions no taller
/// than `min_height` are rejected as degenerate.
pub fn flow_region_below(
    text_end: TextEnd,
    anchor_region: &PixelRect,
    flow: &FlowBelowRegion,
    factors: ScaleFactors,
    image_width: u32,
    image_height: u32,
) -> Result<PixelRect, ExtractionError> {
    let text_end = text_end.boundary(anchor_region);

    let latest_start = image_height.saturating_sub(factors.scale_y(flow.start_clamp));
    let start = (text_end + factors.scale_y(flow.anchor_margin)).min(latest_start);

    let height =
        image_height as i64 - start as i64 - factors.scale_y(flow.bottom_margin) as i64;
    let min_height = factors.scale_y(flow.min_height);

    let degenerate = || ExtractionError::RegionDegenerate {
        name: flow.name.clone(),
        height,
        min_height,
    };

    if height <= min_height as i64 {
        return Err(degenerate());
    }

    PixelRect::new(
        factors.scale_x(flow.x),
        start,
        factors.scale_x(flow.width),
        height as u32,
    )
    .clip_to(image_width, image_height)
    .ok_or_else(degenerate)
}
