use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;
use crate::log;

/// Traineddata models the bulletin pipeline needs.
const REQUIRED_LANGUAGES: [&str; 2] = ["kor", "eng"];

#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets Tesseract use its compiled-in data directory
    pub tessdata: Option<PathBuf>,
}

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

/// Returns the per-user directory for a locally installed Tesseract
pub fn get_user_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bulletin-ocr")
        .join("tesseract")
}

/// Locates the Tesseract executable.
///
/// Order: config override, `<exe_dir>/tesseract/`, the per-user data
/// directory, then `PATH`.
pub fn find_tesseract_executable(config: &OcrConfig) -> Result<PathBuf> {
    if let Some(path) = &config.tesseract_path {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(anyhow!(
            "Configured Tesseract not found: {}",
            path.display()
        ));
    }

    let candidates = [
        crate::paths::get_tesseract_dir().join(executable_name()),
        get_user_tesseract_dir().join(executable_name()),
    ];
    if let Some(found) = candidates.into_iter().find(|p| p.exists()) {
        return Ok(found);
    }

    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(executable_name()))
                .find(|p| p.is_file())
        })
        .ok_or_else(|| anyhow!("Tesseract executable not found (set ocr.tesseract_path in config.json)"))
}

/// Locates the tessdata directory, if one is known.
///
/// Order: config override, `TESSDATA_PREFIX`, `tessdata/` next to the executable.
pub fn find_tessdata_dir(config: &OcrConfig, executable: &Path) -> Option<PathBuf> {
    if let Some(dir) = &config.tessdata_dir {
        return Some(dir.clone());
    }
    if let Some(prefix) = std::env::var_os("TESSDATA_PREFIX") {
        return Some(PathBuf::from(prefix));
    }
    executable
        .parent()
        .map(|dir| dir.join("tessdata"))
        .filter(|dir| dir.is_dir())
}

/// Resolves Tesseract and verifies the Korean and English models are present.
///
/// Missing models are reported in the log but not treated as an error.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config)?;
    let tessdata = find_tessdata_dir(config, &executable);

    let mut command = Command::new(&executable);
    if let Some(dir) = &tessdata {
        command.arg("--tessdata-dir").arg(dir);
    }
    let output = command
        .arg("--list-langs")
        .output()
        .with_context(|| format!("Failed to run {}", executable.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr));
    }

    // Older builds print the list on stderr
    let listing = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let installed = parse_language_list(&listing);
    for lang in REQUIRED_LANGUAGES {
        if !installed.iter().any(|l| l == lang) {
            log(&format!(
                "Warning: Tesseract language '{}' not installed; OCR quality will suffer",
                lang
            ));
        }
    }

    log(&format!("Tesseract found at: {}", executable.display()));

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Parses `tesseract --list-langs` output into language codes.
fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' ') && !line.ends_with(':'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language_list() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nkor\nosd\n";
        assert_eq!(parse_language_list(listing), vec!["eng", "kor", "osd"]);
    }

    #[test]
    fn test_configured_missing_executable_is_an_error() {
        let config = OcrConfig {
            tesseract_path: Some(PathBuf::from("/definitely/not/here/tesseract")),
            ..OcrConfig::default()
        };
        assert!(find_tesseract_executable(&config).is_err());
    }

    #[test]
    fn test_configured_tessdata_wins() {
        let config = OcrConfig {
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            ..OcrConfig::default()
        };
        assert_eq!(
            find_tessdata_dir(&config, Path::new("/usr/bin/tesseract")),
            Some(PathBuf::from("/opt/tessdata"))
        );
    }
}
