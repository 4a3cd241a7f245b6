use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

use crate::error::EditError;

use super::parse::parse_tsv_words;
use super::{Progress, Recognition, Recognizer};

/// Sparse text: find as many words as possible in no particular order.
const PAGE_SEGMENTATION_MODE: u32 = 11;

/// Shells out to the `tesseract` binary and reads its word-level TSV output.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    min_confidence: f32,
}

impl TesseractRecognizer {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image: &RgbaImage,
        language: &str,
        progress: Progress<'_>,
    ) -> Result<Recognition, EditError> {
        progress("preparing image", 0.1);
        let languages = normalize_ocr_languages(language)
            .map_err(|err| EditError::RecognitionFailure(err.to_string()))?;
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|err| EditError::RecognitionFailure(format!("temp file: {}", err)))?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .map_err(|err| EditError::RecognitionFailure(format!("temp image: {}", err)))?;
        tmp.flush().ok();

        progress("recognizing text", 0.3);
        let tsv = run_tesseract_tsv(tmp.path(), &languages, PAGE_SEGMENTATION_MODE)?;

        progress("reading results", 0.9);
        let words = parse_tsv_words(&tsv)
            .into_iter()
            .filter(|word| word.confidence >= self.min_confidence)
            .collect::<Vec<_>>();
        debug!("tesseract found {} words", words.len());

        progress("done", 1.0);
        Ok(Recognition {
            width: image.width(),
            height: image.height(),
            words,
        })
    }
}

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

/// Keeps the requested languages that are installed, joined with `+`.
/// When the installed list cannot be read the request is passed through.
pub fn normalize_ocr_languages(requested: &str) -> Result<String> {
    let available = match list_tesseract_languages() {
        Ok(list) => list,
        Err(err) => {
            debug!("cannot list tesseract languages: {}", err);
            let trimmed = requested.trim();
            if trimmed.is_empty() {
                return Err(anyhow!("ocr languages is empty"));
            }
            return Ok(trimmed.to_string());
        }
    };
    choose_languages(requested, &available)
}

fn choose_languages(requested: &str, available: &[String]) -> Result<String> {
    let mut chosen = Vec::new();
    let mut missing = Vec::new();
    for lang in requested.split(['+', ',', ' ']).map(str::trim) {
        if lang.is_empty() {
            continue;
        }
        if available.iter().any(|value| value == lang) {
            chosen.push(lang.to_string());
        } else {
            missing.push(lang.to_string());
        }
    }
    if chosen.is_empty() && missing.is_empty() {
        return Err(anyhow!("ocr languages is empty"));
    }
    if chosen.is_empty() {
        return Err(anyhow!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(
            "ocr language(s) not available: {} (available: {})",
            missing.join(", "),
            available.join(", ")
        );
    }
    Ok(chosen.join("+"))
}

fn run_tesseract_tsv(path: &Path, languages: &str, psm: u32) -> Result<String, EditError> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv")
        .output()
        .map_err(spawn_error)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EditError::RecognitionFailure(format!(
            "tesseract failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// A missing binary means recognition is unavailable; any other spawn
/// error is a failure of this run.
fn spawn_error(err: io::Error) -> EditError {
    match err.kind() {
        io::ErrorKind::NotFound => {
            EditError::RecognitionUnavailable("tesseract is not installed".to_string())
        }
        _ => EditError::RecognitionFailure(format!("failed to run tesseract: {}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_unavailable() {
        let err = spawn_error(io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, EditError::RecognitionUnavailable(_)));

        let err = spawn_error(io::Error::from(io::ErrorKind::PermissionDenied));
        match err {
            EditError::RecognitionFailure(message) => {
                assert!(message.starts_with("failed to run tesseract"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn installed() -> Vec<String> {
        vec!["eng".to_string(), "jpn".to_string()]
    }

    #[test]
    fn keeps_installed_languages_in_order() {
        let chosen = choose_languages("jpn, eng", &installed()).expect("languages");
        assert_eq!(chosen, "jpn+eng");
    }

    #[test]
    fn drops_missing_languages_when_some_remain() {
        let chosen = choose_languages("eng+deu", &installed()).expect("languages");
        assert_eq!(chosen, "eng");
    }

    #[test]
    fn rejects_when_nothing_is_installed() {
        let err = choose_languages("deu", &installed()).expect_err("missing");
        assert!(err.to_string().contains("not available"));
        assert!(choose_languages("  ", &installed()).is_err());
    }
}
