//! Scripted OCR backend for unit tests.

use anyhow::{anyhow, Result};
use image::GrayImage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::engine::{OcrBackend, OcrProfile, OcrWord};

/// Languages the scripted backend treats as anchor searches.
pub const LAYOUT_LANGUAGES: &str = "kor";

/// Returns canned results keyed by page segmentation mode.
///
/// - Gated region profiles (`--oem 3`) answer from `with_text`/`with_text_only`.
/// - The ungated fallback profile (no `--oem`) answers from `with_fallback_text`.
/// - Word passes in [`LAYOUT_LANGUAGES`] answer with the layout words.
#[derive(Default)]
pub struct ScriptedBackend {
    texts: HashMap<u8, String>,
    confidences: HashMap<u8, f32>,
    fallback_text: Option<String>,
    layout_words: Option<Vec<OcrWord>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_text(mut self, psm: u8, text: &str, confidence: f32) -> Self {
        self.texts.insert(psm, text.to_string());
        self.confidences.insert(psm, confidence);
        self
    }

    pub fn with_text_only(mut self, psm: u8, text: &str) -> Self {
        self.texts.insert(psm, text.to_string());
        self
    }

    pub fn with_fallback_text(mut self, text: &str) -> Self {
        self.fallback_text = Some(text.to_string());
        self
    }

    pub fn with_layout_words(mut self, words: Vec<OcrWord>) -> Self {
        self.layout_words = Some(words);
        self
    }

    /// Same text and confidence for every gated profile.
    pub fn answering_everything(mut self, text: &str, confidence: f32) -> Self {
        for psm in [6, 8, 13, 3, 4] {
            self = self.with_text(psm, text, confidence);
        }
        self
    }

    /// Total number of recognition calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn word(text: &str, top: u32, height: u32) -> OcrWord {
    OcrWord {
        text: text.to_string(),
        left: 0,
        top,
        width: 40,
        height,
        confidence: 90.0,
    }
}

impl OcrBackend for ScriptedBackend {
    fn recognize_text(&self, _img: &GrayImage, profile: &OcrProfile) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = if profile.oem.is_none() {
            self.fallback_text.clone()
        } else {
            self.texts.get(&profile.psm).cloned()
        };
        scripted.ok_or_else(|| anyhow!("no scripted text for {}", profile))
    }

    fn recognize_words(&self, _img: &GrayImage, profile: &OcrProfile) -> Result<Vec<OcrWord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if profile.languages == LAYOUT_LANGUAGES {
            return self
                .layout_words
                .clone()
                .ok_or_else(|| anyhow!("no scripted layout"));
        }
        self.confidences
            .get(&profile.psm)
            .map(|&confidence| {
                vec![OcrWord {
                    confidence,
                    ..word("scripted", 0, 10)
                }]
            })
            .ok_or_else(|| anyhow!("no scripted words for {}", profile))
    }
}
