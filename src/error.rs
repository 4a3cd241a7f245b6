use thiserror::Error;

use crate::words::WordId;

/// Failures surfaced by the editing session.
///
/// `SamplingFailure` and `ReconstructionFailure` are produced by the pixel
/// pipeline but are always converted into fallbacks before they reach a
/// caller of [`crate::Compositor::replace`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("text recognition is unavailable: {0}")]
    RecognitionUnavailable(String),
    #[error("text recognition failed: {0}")]
    RecognitionFailure(String),
    #[error("pixel ({x}, {y}) cannot be sampled")]
    SamplingFailure { x: i64, y: i64 },
    #[error("background reconstruction failed: {0}")]
    ReconstructionFailure(String),
    #[error("word {0} not found")]
    NotFound(WordId),
    #[error("operation not allowed while the session is {0}")]
    InvalidState(&'static str),
}
