//! Bulletin layout: reference frame, page order and per-page-type regions.
//!
//! All coordinates are authored against the reference frame (the resolution
//! the bulletin scans were measured at) and scaled per image at runtime.
//! The defaults describe the weekly church bulletin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label for pages that carry no OCR configuration (adverts, trailing pages).
pub const IGNORE_PAGE: &str = "기타";

pub const COVER_PAGE: &str = "표지";
pub const WORSHIP_PAGE: &str = "예배안내_페이지";
pub const SCRIPTURE_PAGE: &str = "오늘의말씀_페이지";
pub const NEWS_PAGE: &str = "교회소식_페이지";

/// Resolution in which nominal ROI coordinates are authored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    pub width: u32,
    pub height: u32,
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self {
            width: 1748,
            height: 2480,
        }
    }
}

/// A rectangle in reference-frame units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RoiRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grows the rectangle by `pad` on every side. The origin floors at 0.
    pub fn expanded(&self, pad: u32) -> Self {
        Self {
            x: self.x.saturating_sub(pad),
            y: self.y.saturating_sub(pad),
            width: self.width + 2 * pad,
            height: self.height + 2 * pad,
        }
    }
}

/// A named region of interest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub name: String,
    pub coords: RoiRect,
}

impl Roi {
    pub fn new(name: &str, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            coords: RoiRect::new(x, y, width, height),
        }
    }
}

/// A region whose top edge follows the end of the text in another region
/// and which extends down to the bottom of the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowBelowRegion {
    /// Name of the produced region
    pub name: String,
    /// Static ROI whose text end marks where this region begins
    pub anchor_roi: String,
    /// Left edge (reference units)
    pub x: u32,
    /// Width (reference units)
    pub width: u32,
    /// Gap between the last text line of the anchor ROI and the region top
    pub anchor_margin: u32,
    /// Gap kept above the physical page bottom
    pub bottom_margin: u32,
    /// Regions shorter than this are skipped
    pub min_height: u32,
    /// The region never starts closer than this to the page bottom
    pub start_clamp: u32,
    /// Printed heading of the region, searched by `debug-roi --locate`
    #[serde(default)]
    pub label: Option<String>,
    /// Word fragments the heading may be split into by OCR
    #[serde(default)]
    pub label_keywords: Vec<String>,
}

/// How the regions of a page type are resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegionStrategy {
    /// Only the configured ROIs, at fixed positions
    #[default]
    Static,
    /// The configured ROIs plus one region placed below an anchor ROI's text
    FlowBelow(FlowBelowRegion),
}

/// ROI set for one page type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub rois: Vec<Roi>,
    #[serde(default)]
    pub strategy: RegionStrategy,
}

impl PageLayout {
    pub fn static_rois(rois: Vec<Roi>) -> Self {
        Self {
            rois,
            strategy: RegionStrategy::Static,
        }
    }

    pub fn roi(&self, name: &str) -> Option<&Roi> {
        self.rois.iter().find(|r| r.name == name)
    }
}

/// Complete layout of one bulletin edition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletinLayout {
    /// Resolution the coordinates below were measured at
    pub reference: ReferenceFrame,
    /// Pixels added around every static ROI before scaling
    pub roi_padding: u32,
    /// Page type label per zero-based page index
    pub page_order: Vec<String>,
    /// Label for pages without OCR configuration
    pub ignore_label: String,
    /// ROI sets keyed by page type label
    pub pages: BTreeMap<String, PageLayout>,
}

impl Default for BulletinLayout {
    fn default() -> Self {
        let mut pages = BTreeMap::new();

        pages.insert(
            COVER_PAGE.to_string(),
            PageLayout::static_rois(vec![
                Roi::new("통권", 90, 100, 460, 70),
                Roi::new("날짜", 900, 100, 740, 70),
            ]),
        );
        pages.insert(
            WORSHIP_PAGE.to_string(),
            PageLayout::static_rois(vec![
                Roi::new("예배안내", 100, 70, 910, 2350),
                Roi::new("기도제목_통계", 1070, 70, 650, 2350),
            ]),
        );
        pages.insert(
            SCRIPTURE_PAGE.to_string(),
            PageLayout {
                rois: vec![Roi::new("오늘의 말씀", 60, 90, 1650, 1700)],
                strategy: RegionStrategy::FlowBelow(FlowBelowRegion {
                    name: "설교메모".to_string(),
                    anchor_roi: "오늘의 말씀".to_string(),
                    x: 60,
                    width: 1650,
                    anchor_margin: 20,
                    bottom_margin: 20,
                    min_height: 50,
                    start_clamp: 100,
                    label: Some("설교메모".to_string()),
                    label_keywords: vec!["설교".to_string(), "메모".to_string()],
                }),
            },
        );
        pages.insert(
            NEWS_PAGE.to_string(),
            PageLayout::static_rois(vec![
                Roi::new("교회소식", 70, 70, 1600, 2010),
                Roi::new("온라인헌금안내", 70, 2100, 1600, 300),
            ]),
        );

        Self {
            reference: ReferenceFrame::default(),
            roi_padding: 2,
            page_order: vec![
                COVER_PAGE.to_string(),
                WORSHIP_PAGE.to_string(),
                SCRIPTURE_PAGE.to_string(),
                NEWS_PAGE.to_string(),
                IGNORE_PAGE.to_string(),
            ],
            ignore_label: IGNORE_PAGE.to_string(),
            pages,
        }
    }
}

impl BulletinLayout {
    /// Returns the layout for a page type label, if one is configured.
    pub fn page(&self, label: &str) -> Option<&PageLayout> {
        self.pages.get(label)
    }

    /// Nominal coordinates of a ROI with the configured padding applied.
    pub fn padded(&self, roi: &Roi) -> RoiRect {
        roi.coords.expanded(self.roi_padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_floors_at_zero() {
        let rect = RoiRect::new(1, 10, 100, 50).expanded(2);
        assert_eq!(rect, RoiRect::new(0, 8, 104, 54));
    }

    #[test]
    fn test_default_layout_covers_every_ordered_page() {
        let layout = BulletinLayout::default();
        for label in &layout.page_order {
            if *label == layout.ignore_label {
                continue;
            }
            assert!(layout.page(label).is_some(), "missing layout for {}", label);
        }
    }

    #[test]
    fn test_scripture_page_flows_below_static_roi() {
        let layout = BulletinLayout::default();
        let page = layout.page(SCRIPTURE_PAGE).unwrap();
        match &page.strategy {
            RegionStrategy::FlowBelow(flow) => {
                assert_eq!(flow.name, "설교메모");
                assert!(page.roi(&flow.anchor_roi).is_some());
            }
            RegionStrategy::Static => panic!("scripture page should be dynamic"),
        }
    }

    #[test]
    fn test_layout_json_round_trip_keeps_strategy() {
        let layout = BulletinLayout::default();
        let json = serde_json::to_string(&layout).unwrap();
        assert!(json.contains("\"kind\":\"flow_below\""));
        let parsed: BulletinLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, layout);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: BulletinLayout = serde_json::from_str(r#"{"roi_padding": 0}"#).unwrap();
        assert_eq!(parsed.roi_padding, 0);
        assert_eq!(parsed.reference, ReferenceFrame::default());
        assert_eq!(parsed.page_order.len(), 5);
    }
}
