//! Bulletin processing state machine.
//!
//! NotStarted → Skipped                (store already holds a document)
//! NotStarted → InProgress → Completed (document saved)
//!                         → Failed    (no usable page, or store error)
//!
//! Page and region problems are handled locally and never fail the bulletin
//! on their own.

use std::fmt;
use std::path::{Path, PathBuf};

use super::regions::RegionExtractor;
use super::store::DocumentStore;
use super::dynamic::DynamicRegionResolver;
use crate::config::AppConfig;
use crate::error::ExtractionError;
use crate::layout::{PageClass, PageClassifier, ScaleFactors};
use crate::log;
use crate::ocr::{AnchorLocator, MultiConfigOcr, OcrBackend};

/// Separator between region fragments in a bulletin document.
pub const FRAGMENT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq)]
pub enum BulletinState {
    NotStarted,
    InProgress,
    Completed,
    /// A document already existed; no OCR was performed
    Skipped,
    Failed(String),
}

impl fmt::Display for BulletinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulletinState::NotStarted => write!(f, "Not started"),
            BulletinState::InProgress => write!(f, "In progress"),
            BulletinState::Completed => write!(f, "Completed"),
            BulletinState::Skipped => write!(f, "Skipped"),
            BulletinState::Failed(msg) => write!(f, "Failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    /// Clear any stored document first, so the bulletin is processed again
    pub force: bool,
}

/// Result of processing one bulletin.
#[derive(Debug, Clone)]
pub struct BulletinOutcome {
    pub id: String,
    pub state: BulletinState,
    pub pages_processed: usize,
    pub pages_ignored: usize,
    pub pages_unreadable: usize,
    /// Region names that produced a fragment, in document order
    pub regions: Vec<String>,
    /// Regions skipped with the reason
    pub skipped_regions: Vec<(String, String)>,
    /// The saved document, when completed
    pub document: Option<String>,
}

impl BulletinOutcome {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            state: BulletinState::NotStarted,
            pages_processed: 0,
            pages_ignored: 0,
            pages_unreadable: 0,
            regions: Vec::new(),
            skipped_regions: Vec::new(),
            document: None,
        }
    }

    fn transition(&mut self, state: BulletinState) {
        log(&format!("[{}] {} -> {}", self.id, self.state, state));
        self.state = state;
    }

    fn fail(&mut self, error: ExtractionError) {
        log(&format!("[{}] {}", self.id, error));
        self.transition(BulletinState::Failed(error.to_string()));
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, BulletinState::Failed(_))
    }
}

/// Runs the OCR pipeline over the pages of one bulletin.
pub struct BulletinProcessor<'a> {
    config: &'a AppConfig,
    backend: &'a dyn OcrBackend,
    store: &'a dyn DocumentStore,
}

impl<'a> BulletinProcessor<'a> {
    pub fn new(config: &'a AppConfig, backend: &'a dyn OcrBackend, store: &'a dyn DocumentStore) -> Self {
        Self {
            config,
            backend,
            store,
        }
    }

    fn extractor(&self) -> RegionExtractor<'a> {
        RegionExtractor::new(
            &self.config.layout,
            MultiConfigOcr::new(self.backend, &self.config.ocr.text_languages),
            DynamicRegionResolver::new(AnchorLocator::new(
                self.backend,
                &self.config.ocr.anchor_languages,
            )),
        )
    }

    /// Processes one bulletin. `images` must be in bulletin page order.
    pub fn process(&self, id: &str, images: &[PathBuf], options: ProcessOptions) -> BulletinOutcome {
        let mut outcome = BulletinOutcome::new(id);

        if options.force {
            if let Err(e) = self.store.clear_document(id) {
                outcome.transition(BulletinState::Failed(format!("document store error: {:#}", e)));
                return outcome;
            }
            log(&format!("[{}] Cleared stored document (forced reprocess)", id));
        }

        match self.store.has_document(id) {
            Ok(true) => {
                log(&format!("[{}] Already processed, skipping", id));
                outcome.transition(BulletinState::Skipped);
                return outcome;
            }
            Ok(false) => {}
            Err(e) => {
                outcome.transition(BulletinState::Failed(format!("document store error: {:#}", e)));
                return outcome;
            }
        }

        if images.is_empty() {
            outcome.fail(ExtractionError::BulletinUnprocessable {
                id: id.to_string(),
                reason: "no images supplied".to_string(),
            });
            return outcome;
        }

        outcome.transition(BulletinState::InProgress);
        log(&format!("[{}] Processing {} page(s)", id, images.len()));

        let layout = &self.config.layout;
        let classifier = PageClassifier::new(layout);
        let extractor = self.extractor();
        let mut fragments: Vec<String> = Vec::new();

        for (index, path) in images.iter().enumerate() {
            log(&format!("[{}] Page {}: {}", id, index + 1, path.display()));

            let label = match classifier.classify(index) {
                PageClass::Ignore => {
                    log(&format!("  > '{}' page, skipping", layout.ignore_label));
                    outcome.pages_ignored += 1;
                    continue;
                }
                PageClass::Typed(label) => label,
            };

            let Some(page) = layout.page(label) else {
                log(&format!("  > No layout for page type '{}', skipping", label));
                outcome.pages_ignored += 1;
                continue;
            };

            // The page image is dropped at the end of this iteration
            let img = match load_page(path) {
                Ok(img) => img,
                Err(e) => {
                    log(&format!("  > {}", e));
                    outcome.pages_unreadable += 1;
                    continue;
                }
            };

            let factors = ScaleFactors::for_image(layout.reference, img.width(), img.height());
            log(&format!(
                "  > '{}' ({}x{}, scale {:.3}x{:.3})",
                label,
                img.width(),
                img.height(),
                factors.x,
                factors.y
            ));

            let extraction = extractor.extract_page(page, &img, factors);
            for result in &extraction.results {
                outcome.regions.push(result.region_name.clone());
                fragments.push(result.fragment());
            }
            outcome.skipped_regions.extend(extraction.skipped);
            outcome.pages_processed += 1;
        }

        if outcome.pages_processed == 0 {
            outcome.fail(ExtractionError::BulletinUnprocessable {
                id: id.to_string(),
                reason: format!(
                    "no usable pages ({} ignored, {} unreadable)",
                    outcome.pages_ignored, outcome.pages_unreadable
                ),
            });
            return outcome;
        }

        let document = fragments.join(FRAGMENT_SEPARATOR);
        if let Err(e) = self.store.save_document(id, &document) {
            outcome.transition(BulletinState::Failed(format!("document store error: {:#}", e)));
            return outcome;
        }

        log(&format!(
            "[{}] Saved document: {} region(s) from {} page(s)",
            id,
            outcome.regions.len(),
            outcome.pages_processed
        ));
        outcome.document = Some(document);
        outcome.transition(BulletinState::Completed);
        outcome
    }
}

fn load_page(path: &Path) -> Result<image::RgbaImage, ExtractionError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| ExtractionError::ImageUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}
