//! Locating text labels and text extents inside a region.
//!
//! All returned y-coordinates are absolute page pixels: the region's top
//! offset plus the word's offset inside the region.

use anyhow::Result;
use image::GrayImage;
use regex::Regex;

use super::engine::{OcrBackend, OcrProfile, OcrWord};
use crate::layout::PixelRect;

/// Whitespace and the filled-square bullet the bulletin prints before labels.
const NOISE_PATTERN: &str = r"[\s■]";

/// Word-box recognizer for anchor searches.
pub struct AnchorLocator<'a> {
    backend: &'a dyn OcrBackend,
    profile: OcrProfile,
}

impl<'a> AnchorLocator<'a> {
    /// Automatic page segmentation with the LSTM engine.
    pub fn new(backend: &'a dyn OcrBackend, languages: &str) -> Self {
        Self {
            backend,
            profile: OcrProfile {
                psm: 3,
                oem: Some(3),
                preserve_interword_spaces: false,
                languages: languages.to_string(),
            },
        }
    }

    /// Top edge of the first word containing `target`.
    pub fn find_text_top(
        &self,
        img: &GrayImage,
        target: &str,
        region: &PixelRect,
    ) -> Result<Option<u32>> {
        let noise = Regex::new(NOISE_PATTERN)?;
        let words = self.backend.recognize_words(img, &self.profile)?;
        Ok(text_top(&words, target, region.y, &noise))
    }

    /// Bottom edge of the first word containing any of `keywords`.
    pub fn find_label_bottom(
        &self,
        img: &GrayImage,
        keywords: &[&str],
        region: &PixelRect,
    ) -> Result<Option<u32>> {
        let words = self.backend.recognize_words(img, &self.profile)?;
        Ok(label_bottom(&words, keywords, region.y))
    }

    /// Lowest bottom edge of any recognized word, i.e. where the text ends.
    pub fn find_last_text_bottom(&self, img: &GrayImage, region: &PixelRect) -> Result<Option<u32>> {
        let words = self.backend.recognize_words(img, &self.profile)?;
        Ok(last_text_bottom(&words, region.y))
    }
}

fn normalize(text: &str, noise: &Regex) -> String {
    noise.replace_all(text, "").into_owned()
}

/// Finds `target` in a single word, or spanning consecutive words.
pub fn text_top(words: &[OcrWord], target: &str, offset_y: u32, noise: &Regex) -> Option<u32> {
    let target = normalize(target, noise);
    if target.is_empty() {
        return None;
    }

    let normalized: Vec<String> = words.iter().map(|w| normalize(&w.text, noise)).collect();

    if let Some(i) = normalized.iter().position(|t| t.contains(&target)) {
        return Some(offset_y + words[i].top);
    }

    // Labels are often split into several words ("설교" "메모")
    let joined: String = normalized.concat();
    let start = joined.find(&target)?;
    let mut consumed = 0;
    for (i, text) in normalized.iter().enumerate() {
        consumed += text.len();
        if consumed > start {
            return Some(offset_y + words[i].top);
        }
    }
    None
}

pub fn label_bottom(words: &[OcrWord], keywords: &[&str], offset_y: u32) -> Option<u32> {
    words
        .iter()
        .find(|w| keywords.iter().any(|k| w.text.contains(k)))
        .map(|w| offset_y + w.bottom())
}

pub fn last_text_bottom(words: &[OcrWord], offset_y: u32) -> Option<u32> {
    words
        .iter()
        .filter(|w| !w.text.trim().is_empty())
        .map(|w| offset_y + w.bottom())
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::{word, ScriptedBackend, LAYOUT_LANGUAGES};
    use image::ImageBuffer;

    fn noise() -> Regex {
        Regex::new(NOISE_PATTERN).unwrap()
    }

    #[test]
    fn test_sermon_memo_label_bottom() {
        let words = vec![word("설교", 1800, 40), word("메모", 1800, 40)];
        assert_eq!(label_bottom(&words, &["설교", "메모"], 0), Some(1840));
        assert_eq!(last_text_bottom(&words, 0), Some(1840));
    }

    #[test]
    fn test_text_top_strips_noise_glyph() {
        let words = vec![word("오늘의", 10, 30), word("■설교메모", 500, 40)];
        assert_eq!(text_top(&words, "설교메모", 90, &noise()), Some(590));
    }

    #[test]
    fn test_text_top_spanning_words() {
        let words = vec![word("본문", 10, 30), word("설교", 700, 40), word("메모", 702, 40)];
        assert_eq!(text_top(&words, "설교 메모", 0, &noise()), Some(700));
    }

    #[test]
    fn test_text_top_not_found_is_none_not_zero() {
        let words = vec![word("광고", 0, 30)];
        assert_eq!(text_top(&words, "설교메모", 0, &noise()), None);
        assert_eq!(text_top(&[], "설교메모", 0, &noise()), None);
    }

    #[test]
    fn test_last_text_bottom_takes_lowest_edge() {
        let words = vec![word("첫째", 10, 30), word("셋째", 300, 35), word("둘째", 200, 30)];
        assert_eq!(last_text_bottom(&words, 90), Some(425));
        assert_eq!(last_text_bottom(&[], 90), None);
    }

    #[test]
    fn test_locator_offsets_by_region() {
        let backend = ScriptedBackend::default()
            .with_layout_words(vec![word("설교", 1800, 40), word("메모", 1800, 40)]);
        let locator = AnchorLocator::new(&backend, LAYOUT_LANGUAGES);
        let img: GrayImage = ImageBuffer::new(10, 10);

        let region = PixelRect::new(0, 0, 1748, 2480);
        assert_eq!(
            locator.find_label_bottom(&img, &["설교", "메모"], &region).unwrap(),
            Some(1840)
        );

        let region = PixelRect::new(60, 90, 1650, 1700);
        assert_eq!(locator.find_text_top(&img, "메모", &region).unwrap(), Some(1890));
    }
}
