//! ROI debugging aids: a coordinate summary and rectangle overlays drawn on
//! real page images, for checking the layout against a new bulletin design.

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::dynamic::DynamicRegionResolver;
use crate::layout::{
    scale_rect, BulletinLayout, FlowBelowRegion, PageClass, PageClassifier, PageLayout, PixelRect,
    RegionStrategy, ScaleFactors,
};

/// Rectangle outline thickness in pixels.
const OUTLINE_WIDTH: u32 = 3;

const ORANGE: Rgba<u8> = Rgba([255, 165, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Scripture and news regions in orange, everything else green.
fn region_color(name: &str) -> Rgba<u8> {
    if name.contains("말씀") || name.contains("소식") {
        ORANGE
    } else {
        GREEN
    }
}

/// Describes every configured ROI (nominal coordinates with padding applied).
pub fn roi_summary(layout: &BulletinLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Reference frame: {}x{}",
        layout.reference.width, layout.reference.height
    );
    let _ = writeln!(out, "ROI padding: {}px", layout.roi_padding);

    let _ = writeln!(out, "Page order:");
    for (index, label) in layout.page_order.iter().enumerate() {
        let _ = writeln!(out, "  {}: {}", index, label);
    }

    for (label, page) in &layout.pages {
        let _ = writeln!(out, "\n[{}]", label);
        for roi in &page.rois {
            let r = layout.padded(roi);
            let _ = writeln!(out, "  {}: ({}, {}, {}, {})", roi.name, r.x, r.y, r.width, r.height);
        }
        if let RegionStrategy::FlowBelow(flow) = &page.strategy {
            let _ = writeln!(
                out,
                "  {}: x={} w={}, starts {} below the text of '{}' (min height {})",
                flow.name, flow.x, flow.width, flow.anchor_margin, flow.anchor_roi, flow.min_height
            );
        }
    }
    out
}

/// Draws the static ROIs of `page` onto `img`, scaled to its resolution.
pub fn draw_roi_overlay(img: &mut RgbaImage, page: &PageLayout, layout: &BulletinLayout) {
    let (width, height) = img.dimensions();
    let factors = ScaleFactors::for_image(layout.reference, width, height);

    for roi in &page.rois {
        if let Some(region) = scale_rect(layout.padded(roi), factors).clip_to(width, height) {
            draw_outline(img, &region, region_color(&roi.name));
        }
    }
}

fn draw_outline(img: &mut RgbaImage, region: &PixelRect, color: Rgba<u8>) {
    for inset in 0..OUTLINE_WIDTH {
        if region.width <= 2 * inset || region.height <= 2 * inset {
            break;
        }
        let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32)
            .of_size(region.width - 2 * inset, region.height - 2 * inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Runs the flow-region search on an unmarked page and logs where the
/// anchor text ends and where the region's label was recognized.
///
/// Returns the resolved flow region, if it is not degenerate.
fn locate_flow_region(
    resolver: &DynamicRegionResolver<'_>,
    img: &RgbaImage,
    page: &PageLayout,
    flow: &FlowBelowRegion,
    layout: &BulletinLayout,
) -> Option<PixelRect> {
    let Some(anchor) = page.roi(&flow.anchor_roi) else {
        crate::log(&format!("  > anchor ROI '{}' is not configured", flow.anchor_roi));
        return None;
    };
    let (width, height) = img.dimensions();
    let factors = ScaleFactors::for_image(layout.reference, width, height);
    let anchor_region = scale_rect(anchor.coords, factors);

    match resolver.locate_label(img, &anchor_region, flow, factors) {
        Ok(Some(position)) => crate::log(&format!(
            "  > label '{}': top={} bottom={}",
            position.label,
            position.top.map_or("not found".to_string(), |y| y.to_string()),
            position.bottom.map_or("not found".to_string(), |y| y.to_string()),
        )),
        Ok(None) => {}
        Err(e) => crate::log(&format!("  > label search failed: {:#}", e)),
    }

    match resolver.resolve(img, &anchor_region, flow, factors) {
        Ok(region) => {
            crate::log(&format!(
                "  > '{}': x={} y={} w={} h={}",
                flow.name, region.x, region.y, region.width, region.height
            ));
            Some(region)
        }
        Err(e) => {
            crate::log(&format!("  > '{}': {}", flow.name, e));
            None
        }
    }
}

/// Writes `debug_<file name>` with the ROI overlay for the page at `index`.
///
/// With a resolver, flow regions are located on the page as well and drawn
/// in blue. Returns `None` for pages without a layout.
pub fn save_roi_overlay(
    path: &Path,
    index: usize,
    layout: &BulletinLayout,
    output_dir: &Path,
    resolver: Option<&DynamicRegionResolver<'_>>,
) -> Result<Option<PathBuf>> {
    let label = match PageClassifier::new(layout).classify(index) {
        PageClass::Typed(label) => label,
        PageClass::Ignore => return Ok(None),
    };
    let Some(page) = layout.page(label) else {
        return Ok(None);
    };

    let mut img = image::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .to_rgba8();

    let flow_region = match (resolver, &page.strategy) {
        (Some(resolver), RegionStrategy::FlowBelow(flow)) => {
            locate_flow_region(resolver, &img, page, flow, layout)
        }
        _ => None,
    };

    draw_roi_overlay(&mut img, page, layout);
    if let Some(region) = flow_region {
        draw_outline(&mut img, &region, BLUE);
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("page_{:02}.png", index + 1));
    let output_path = output_dir.join(format!("debug_{}", file_name));
    img.save(&output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;

    crate::log(&format!("ROI overlay saved: {}", output_path.display()));
    Ok(Some(output_path))
}
