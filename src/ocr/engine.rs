use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::fmt;
use std::process::Command;
use tempfile::NamedTempFile;

use super::setup::TesseractPaths;

/// One Tesseract invocation setup.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrProfile {
    /// Page segmentation mode
    pub psm: u8,
    /// OCR engine mode, engine default when `None`
    pub oem: Option<u8>,
    pub preserve_interword_spaces: bool,
    /// Tesseract language string, e.g. `kor+eng`
    pub languages: String,
}

impl OcrProfile {
    pub fn new(psm: u8, languages: &str) -> Self {
        Self {
            psm,
            oem: None,
            preserve_interword_spaces: false,
            languages: languages.to_string(),
        }
    }

    /// LSTM engine with interword spacing kept, as used for region text.
    pub fn lstm(psm: u8, languages: &str) -> Self {
        Self {
            psm,
            oem: Some(3),
            preserve_interword_spaces: true,
            languages: languages.to_string(),
        }
    }

    /// Command line arguments after the input/output operands.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-l".to_string(),
            self.languages.clone(),
            "--psm".to_string(),
            self.psm.to_string(),
        ];
        if let Some(oem) = self.oem {
            args.push("--oem".to_string());
            args.push(oem.to_string());
        }
        if self.preserve_interword_spaces {
            args.push("-c".to_string());
            args.push("preserve_interword_spaces=1".to_string());
        }
        args
    }
}

impl fmt::Display for OcrProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm {}", self.psm)?;
        if let Some(oem) = self.oem {
            write!(f, " oem {}", oem)?;
        }
        Ok(())
    }
}

/// A single word from OCR with its bounding box (region-relative pixels).
#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl OcrWord {
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// Recognition backend. Implementations must be usable from worker threads.
pub trait OcrBackend: Send + Sync {
    /// Plain text recognition.
    fn recognize_text(&self, img: &GrayImage, profile: &OcrProfile) -> Result<String>;

    /// Word-level recognition with boxes and confidences.
    fn recognize_words(&self, img: &GrayImage, profile: &OcrProfile) -> Result<Vec<OcrWord>>;
}

/// Runs the Tesseract command line tool.
pub struct TesseractCli {
    paths: TesseractPaths,
}

impl TesseractCli {
    pub fn new(paths: TesseractPaths) -> Self {
        Self { paths }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.paths.executable);
        if let Some(dir) = &self.paths.tessdata {
            command.arg("--tessdata-dir").arg(dir);
        }
        command
    }

    /// Saves the image to a temporary PNG for Tesseract to read.
    fn stage_input(img: &GrayImage) -> Result<NamedTempFile> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        img.save(temp_input.path())
            .context("Failed to write OCR input image")?;
        Ok(temp_input)
    }
}

impl OcrBackend for TesseractCli {
    fn recognize_text(&self, img: &GrayImage, profile: &OcrProfile) -> Result<String> {
        let temp_input = Self::stage_input(img)?;

        let output = self
            .command()
            .arg(temp_input.path())
            .arg("stdout")
            .args(profile.args())
            .output()
            .context("Failed to run Tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn recognize_words(&self, img: &GrayImage, profile: &OcrProfile) -> Result<Vec<OcrWord>> {
        let temp_input = Self::stage_input(img)?;

        // Tesseract appends the .tsv extension to this base name
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = self
            .command()
            .arg(temp_input.path())
            .arg(&output_base)
            .args(profile.args())
            .arg("tsv")
            .output()
            .context("Failed to run Tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;
        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content))
    }
}

/// Parses Tesseract TSV output into word boxes.
///
/// Only word-level rows (level 5) with non-blank text are kept.
pub fn parse_tsv_output(tsv: &str) -> Vec<OcrWord> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let number = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        words.push(OcrWord {
            text: text.to_string(),
            left: number(6),
            top: number(7),
            width: number(8),
            height: number(9),
            confidence: fields[10].trim().parse().unwrap_or(-1.0),
        });
    }

    words
}
