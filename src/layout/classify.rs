//! Page classification by position within a bulletin.

use super::config::BulletinLayout;

/// Role of one page image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageClass<'a> {
    /// No OCR configuration; skipped without error
    Ignore,
    /// Page type label to look up in the layout
    Typed(&'a str),
}

/// Fixed lookup from zero-based page index to page type.
pub struct PageClassifier<'a> {
    order: &'a [String],
    ignore_label: &'a str,
}

impl<'a> PageClassifier<'a> {
    pub fn new(layout: &'a BulletinLayout) -> Self {
        Self {
            order: &layout.page_order,
            ignore_label: &layout.ignore_label,
        }
    }

    /// Returns the page type for `index`. Indices past the table, and entries
    /// carrying the ignore label, classify as [`PageClass::Ignore`].
    pub fn classify(&self, index: usize) -> PageClass<'a> {
        match self.order.get(index) {
            Some(label) if label != self.ignore_label => PageClass::Typed(label.as_str()),
            _ => PageClass::Ignore,
        }
    }
}
