//! Error taxonomy for bulletin extraction.
//!
//! Page- and region-level variants are recovered where they occur (logged,
//! replaced by a placeholder or skipped). Only `BulletinUnprocessable` is
//! surfaced to the caller as a failed bulletin.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Page image missing or not decodable; the page is skipped.
    #[error("image unreadable: {path}: {reason}")]
    ImageUnreadable { path: PathBuf, reason: String },

    /// Computed dynamic region is too small to contain text.
    #[error("region '{name}' degenerate: height {height}px (minimum {min_height}px)")]
    RegionDegenerate {
        name: String,
        height: i64,
        min_height: u32,
    },

    /// One OCR profile errored; the next profile is tried.
    #[error("OCR profile '{profile}' failed: {reason}")]
    OcrConfigFailed { profile: String, reason: String },

    /// Every OCR attempt for a region failed.
    #[error("all OCR profiles failed for region '{0}'")]
    AllOcrFailed(String),

    /// Expected text not found; a default offset is used instead.
    #[error("anchor text not found in region '{0}'")]
    AnchorNotFound(String),

    /// No page of the bulletin could be processed.
    #[error("bulletin '{id}' unprocessable: {reason}")]
    BulletinUnprocessable { id: String, reason: String },
}
