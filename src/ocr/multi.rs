//! Multi-profile OCR with best-result selection.
//!
//! Each region is recognized with several page segmentation modes. A profile's
//! result replaces the current best only if it is both longer and more
//! confident. If nothing is accepted, one plain block-mode pass runs without
//! the confidence gate.

use image::GrayImage;

use super::engine::{OcrBackend, OcrProfile};
use crate::error::ExtractionError;
use crate::log;

/// Fragment body when every recognition attempt errored.
pub const EXTRACTION_FAILED: &str = "(텍스트 추출 실패)";

/// Fragment body when recognition succeeded but found no text.
pub const NO_TEXT: &str = "(텍스트 없음)";

/// Confidence assumed when a profile's word-level pass fails.
pub const NEUTRAL_CONFIDENCE: f32 = 50.0;

/// Profiles tried for every region, in order:
/// uniform block, single word, raw line, automatic page, single column.
pub fn region_profiles(languages: &str) -> Vec<OcrProfile> {
    [6, 8, 13, 3, 4]
        .into_iter()
        .map(|psm| OcrProfile::lstm(psm, languages))
        .collect()
}

/// The single most reliable profile, used when no candidate was accepted.
pub fn fallback_profile(languages: &str) -> OcrProfile {
    OcrProfile::new(6, languages)
}

/// Result of running one profile.
#[derive(Debug)]
pub enum Attempt {
    Recognized {
        profile: String,
        text: String,
        confidence: f32,
    },
    Failed(ExtractionError),
}

/// Best result so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub profile: String,
    pub text: String,
    pub confidence: f32,
}

impl Candidate {
    fn empty() -> Self {
        Self {
            profile: String::new(),
            text: String::new(),
            confidence: 0.0,
        }
    }

    /// A challenger wins only with strictly more characters AND strictly
    /// higher confidence. Ties keep the earlier profile.
    pub fn is_improved_by(&self, text: &str, confidence: f32) -> bool {
        text.chars().count() > self.text.chars().count() && confidence > self.confidence
    }
}

/// Folds attempts into the best candidate. `None` if nothing was accepted.
pub fn select_best<I>(attempts: I) -> Option<Candidate>
where
    I: IntoIterator<Item = Attempt>,
{
    let best = attempts
        .into_iter()
        .fold(Candidate::empty(), |best, attempt| match attempt {
            Attempt::Recognized {
                profile,
                text,
                confidence,
            } if best.is_improved_by(&text, confidence) => Candidate {
                profile,
                text,
                confidence,
            },
            _ => best,
        });

    if best.text.is_empty() { None } else { Some(best) }
}

/// How a region's text was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionStatus {
    /// Selected from the profile set
    Selected { profile: String, confidence: f32 },
    /// Produced by the ungated fallback pass
    Fallback,
    /// OCR ran but found nothing
    Empty,
    /// Every attempt errored
    Failed,
}

/// Text extracted for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub region_name: String,
    pub text: String,
    pub status: RegionStatus,
}

impl OcrResult {
    /// Result for a region that could not be read at all.
    pub fn failed(region_name: &str) -> Self {
        Self {
            region_name: region_name.to_string(),
            text: EXTRACTION_FAILED.to_string(),
            status: RegionStatus::Failed,
        }
    }

    /// Labeled block for the bulletin document.
    pub fn fragment(&self) -> String {
        format_fragment(&self.region_name, &self.text)
    }
}

pub fn format_fragment(region_name: &str, body: &str) -> String {
    format!("### {}\n\n{}", region_name, body)
}

/// Runs the profile set against preprocessed regions.
pub struct MultiConfigOcr<'a> {
    backend: &'a dyn OcrBackend,
    profiles: Vec<OcrProfile>,
    fallback: OcrProfile,
}

impl<'a> MultiConfigOcr<'a> {
    pub fn new(backend: &'a dyn OcrBackend, languages: &str) -> Self {
        Self {
            backend,
            profiles: region_profiles(languages),
            fallback: fallback_profile(languages),
        }
    }

    /// Runs one profile: text pass, then a word pass for the confidence.
    pub fn attempt(&self, img: &GrayImage, profile: &OcrProfile) -> Attempt {
        let text = match self.backend.recognize_text(img, profile) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                return Attempt::Failed(ExtractionError::OcrConfigFailed {
                    profile: profile.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let confidence = match self.backend.recognize_words(img, profile) {
            Ok(words) => {
                let scores: Vec<f32> = words
                    .iter()
                    .map(|w| w.confidence)
                    .filter(|c| *c >= 0.0)
                    .collect();
                if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f32>() / scores.len() as f32
                }
            }
            Err(_) => NEUTRAL_CONFIDENCE,
        };

        Attempt::Recognized {
            profile: profile.to_string(),
            text,
            confidence,
        }
    }

    /// Extracts the text of one preprocessed region.
    ///
    /// Profile errors are logged and skipped; the result always carries a
    /// body (recognized text or a placeholder).
    pub fn extract(&self, img: &GrayImage, region_name: &str) -> OcrResult {
        let mut any_succeeded = false;

        let attempts: Vec<Attempt> = self
            .profiles
            .iter()
            .map(|profile| {
                let attempt = self.attempt(img, profile);
                match &attempt {
                    Attempt::Failed(e) => log(&format!("  > [{}] {}", region_name, e)),
                    Attempt::Recognized { .. } => any_succeeded = true,
                }
                attempt
            })
            .collect();

        if let Some(best) = select_best(attempts) {
            log(&format!(
                "  > [{}] selected {} ({} chars, conf {:.1})",
                region_name,
                best.profile,
                best.text.chars().count(),
                best.confidence
            ));
            return OcrResult {
                region_name: region_name.to_string(),
                text: best.text,
                status: RegionStatus::Selected {
                    profile: best.profile,
                    confidence: best.confidence,
                },
            };
        }

        match self.backend.recognize_text(img, &self.fallback) {
            Ok(text) if !text.trim().is_empty() => {
                log(&format!("  > [{}] using fallback {}", region_name, self.fallback));
                OcrResult {
                    region_name: region_name.to_string(),
                    text: text.trim().to_string(),
                    status: RegionStatus::Fallback,
                }
            }
            Ok(_) => {
                log(&format!("  > [{}] no text recognized", region_name));
                OcrResult {
                    region_name: region_name.to_string(),
                    text: NO_TEXT.to_string(),
                    status: RegionStatus::Empty,
                }
            }
            Err(e) => {
                let error = if any_succeeded {
                    ExtractionError::OcrConfigFailed {
                        profile: self.fallback.to_string(),
                        reason: e.to_string(),
                    }
                } else {
                    ExtractionError::AllOcrFailed(region_name.to_string())
                };
                log(&format!("  > [{}] {}", region_name, error));
                OcrResult::failed(region_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::ScriptedBackend;
    use image::ImageBuffer;

    fn recognized(text: &str, confidence: f32) -> Attempt {
        Attempt::Recognized {
            profile: format!("{}@{}", text, confidence),
            text: text.to_string(),
            confidence,
        }
    }

    fn failed() -> Attempt {
        Attempt::Failed(ExtractionError::OcrConfigFailed {
            profile: "psm 6".to_string(),
            reason: "boom".to_string(),
        })
    }

    fn blank() -> GrayImage {
        ImageBuffer::new(20, 10)
    }

    #[test]
    fn test_requires_both_longer_and_more_confident() {
        let best = select_best(vec![
            recognized("abc", 60.0),
            recognized("abcdefgh", 40.0), // longer, less confident
            recognized("ab", 90.0),       // shorter, more confident
            recognized("abcd", 61.0),
        ])
        .unwrap();
        assert_eq!(best.text, "abcd");
        assert_eq!(best.confidence, 61.0);
    }

    #[test]
    fn test_ties_keep_earlier_profile() {
        let best = select_best(vec![recognized("abc", 70.0), recognized("xyz", 70.0)]).unwrap();
        assert_eq!(best.text, "abc");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // "설교메모" is 4 chars but 12 bytes
        let best = select_best(vec![recognized("설교메모", 50.0), recognized("abcde", 60.0)]).unwrap();
        assert_eq!(best.text, "abcde");
    }

    #[test]
    fn test_failures_and_empty_yield_none() {
        assert!(select_best(vec![failed(), recognized("", 90.0), failed()]).is_none());
        assert!(select_best(vec![recognized("text", 0.0)]).is_none());
    }

    #[test]
    fn test_accepted_candidates_improve_monotonically() {
        let lengths = [3usize, 1, 7, 5, 9, 2, 9, 12];
        let confidences = [40.0f32, 80.0, 30.0, 55.0, 70.0, 90.0, 75.0, 65.0];

        for rotation in 0..lengths.len() {
            let mut best = Candidate::empty();
            for i in 0..lengths.len() {
                let k = (i + rotation) % lengths.len();
                let text = "x".repeat(lengths[k]);
                let conf = confidences[k];
                let accepted = best.is_improved_by(&text, conf);
                if text.len() < best.text.len() && conf <= best.confidence {
                    assert!(!accepted);
                }
                if accepted {
                    assert!(text.len() > best.text.len() && conf > best.confidence);
                    best = Candidate {
                        profile: String::new(),
                        text,
                        confidence: conf,
                    };
                }
            }
        }
    }

    #[test]
    fn test_extract_picks_conjunctive_best() {
        let backend = ScriptedBackend::default()
            .with_text(6, "짧은 글", 80.0)
            .with_text(8, "조금 더 긴 글입니다", 85.0)
            .with_text(13, "아주 아주 아주 긴 글이지만 신뢰도 낮음", 20.0)
            .with_text(3, "짧", 95.0);
        let ocr = MultiConfigOcr::new(&backend, "kor+eng");

        let result = ocr.extract(&blank(), "교회소식");
        assert_eq!(result.text, "조금 더 긴 글입니다");
        assert_eq!(result.fragment(), "### 교회소식\n\n조금 더 긴 글입니다");
        assert!(matches!(result.status, RegionStatus::Selected { .. }));
    }

    #[test]
    fn test_word_pass_failure_uses_neutral_confidence() {
        let backend = ScriptedBackend::default().with_text_only(4, "본문");
        let ocr = MultiConfigOcr::new(&backend, "kor+eng");

        match ocr.attempt(&blank(), &OcrProfile::lstm(4, "kor+eng")) {
            Attempt::Recognized { confidence, .. } => assert_eq!(confidence, NEUTRAL_CONFIDENCE),
            Attempt::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn test_all_profiles_failing_gives_placeholder() {
        let backend = ScriptedBackend::default();
        let ocr = MultiConfigOcr::new(&backend, "kor+eng");

        let result = ocr.extract(&blank(), "날짜");
        assert_eq!(result.status, RegionStatus::Failed);
        assert_eq!(result.fragment(), "### 날짜\n\n(텍스트 추출 실패)");
    }

    #[test]
    fn test_fallback_runs_without_confidence_gate() {
        // Every gated profile reports zero confidence, so none is accepted
        let backend = ScriptedBackend::default()
            .with_text(6, "희미한 글", 0.0)
            .with_fallback_text("희미한 글");
        let ocr = MultiConfigOcr::new(&backend, "kor+eng");

        let result = ocr.extract(&blank(), "통권");
        assert_eq!(result.status, RegionStatus::Fallback);
        assert_eq!(result.text, "희미한 글");
    }

    #[test]
    fn test_empty_recognition_gives_no_text_placeholder() {
        let backend = ScriptedBackend::default()
            .with_text(6, "   ", 90.0)
            .with_fallback_text("\n");
        let ocr = MultiConfigOcr::new(&backend, "kor+eng");

        let result = ocr.extract(&blank(), "통권");
        assert_eq!(result.status, RegionStatus::Empty);
        assert_eq!(result.text, NO_TEXT);
    }
}
