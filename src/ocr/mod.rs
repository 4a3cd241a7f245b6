mod parse;
mod tesseract;

use anyhow::{Context, Result};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::EditError;
use crate::words::BBox;

pub use parse::parse_tsv_words;
pub use tesseract::{TesseractRecognizer, list_tesseract_languages, normalize_ocr_languages};

/// One word as reported by a recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub confidence: f32,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub width: u32,
    pub height: u32,
    pub words: Vec<RecognizedWord>,
}

/// Receives `(status, fraction)` with `fraction` in `[0, 1]`.
pub type Progress<'a> = &'a mut dyn FnMut(&str, f32);

/// Text recognition engine producing word boxes for an image.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        image: &RgbaImage,
        language: &str,
        progress: Progress<'_>,
    ) -> Result<Recognition, EditError>;
}

/// Returns a fixed word list regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct StaticRecognizer {
    words: Vec<RecognizedWord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordsFile {
    Wrapped { words: Vec<RecognizedWord> },
    Bare(Vec<RecognizedWord>),
}

impl StaticRecognizer {
    pub fn new(words: Vec<RecognizedWord>) -> Self {
        Self { words }
    }

    /// Accepts either `{"words": [...]}` or a bare array of words.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: WordsFile =
            serde_json::from_str(json).with_context(|| "failed to parse words JSON")?;
        let words = match parsed {
            WordsFile::Wrapped { words } => words,
            WordsFile::Bare(words) => words,
        };
        Ok(Self { words })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read words file: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid words file: {}", path.display()))
    }
}

impl Recognizer for StaticRecognizer {
    fn recognize(
        &self,
        image: &RgbaImage,
        _language: &str,
        progress: Progress<'_>,
    ) -> Result<Recognition, EditError> {
        progress("loading words", 0.0);
        let recognition = Recognition {
            width: image.width(),
            height: image.height(),
            words: self.words.clone(),
        };
        progress("done", 1.0);
        Ok(recognition)
    }
}

/// Runs `recognizer` on the blocking pool; progress is forwarded to `progress`.
pub async fn recognize_async<F>(
    recognizer: Arc<dyn Recognizer>,
    image: RgbaImage,
    language: String,
    mut progress: F,
) -> Result<Recognition, EditError>
where
    F: FnMut(&str, f32) + Send + 'static,
{
    tokio::task::spawn_blocking(move || recognizer.recognize(&image, &language, &mut progress))
        .await
        .map_err(|err| EditError::RecognitionFailure(format!("recognition task failed: {}", err)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &str = r#"[
        {"text": "Hello", "confidence": 91.5, "bbox": {"x0": 10, "y0": 10, "x1": 60, "y1": 30}},
        {"text": "World", "confidence": 88.0, "bbox": {"x0": 120, "y0": 30, "x1": 70, "y1": 10}}
    ]"#;

    #[test]
    fn static_recognizer_accepts_bare_and_wrapped_lists() {
        let bare = StaticRecognizer::from_json(WORDS).expect("bare");
        let wrapped =
            StaticRecognizer::from_json(&format!(r#"{{"words": {}}}"#, WORDS)).expect("wrapped");
        assert_eq!(bare.words, wrapped.words);
        assert_eq!(bare.words[1].bbox, BBox::new(70, 10, 120, 30));
    }

    #[test]
    fn static_recognizer_reports_progress() {
        let recognizer = StaticRecognizer::from_json(WORDS).expect("words");
        let image = RgbaImage::new(200, 50);
        let mut seen = Vec::new();
        let result = recognizer
            .recognize(&image, "eng", &mut |status: &str, fraction: f32| {
                seen.push((status.to_string(), fraction))
            })
            .expect("recognize");
        assert_eq!((result.width, result.height), (200, 50));
        assert_eq!(result.words.len(), 2);
        assert_eq!(seen.last().map(|(_, f)| *f), Some(1.0));
    }

    #[test]
    fn invalid_words_file_is_an_error() {
        assert!(StaticRecognizer::from_json("{\"words\": 3}").is_err());
    }

    #[tokio::test]
    async fn recognize_async_runs_on_blocking_pool() {
        let recognizer: Arc<dyn Recognizer> =
            Arc::new(StaticRecognizer::from_json(WORDS).expect("words"));
        let result = recognize_async(recognizer, RgbaImage::new(4, 4), "eng".into(), |_, _| {})
            .await
            .expect("recognize");
        assert_eq!(result.words[0].text, "Hello");
    }
}
