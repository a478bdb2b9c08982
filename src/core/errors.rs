// Custom error types for the pipeline stages
//
// Using thiserror for ergonomic error definitions with:
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use std::path::PathBuf;
use thiserror::Error;

/// Image decoding errors: malformed or unsupported image bytes.
#[derive(Debug, Error)]
#[error("failed to decode image: {0}")]
pub struct DecodeError(#[from] pub image::ImageError);

/// OCR engine errors
#[derive(Debug, Error)]
pub enum OcrError {
    /// Startup precondition: the model asset directories must exist before
    /// the engine can be constructed. This is a deployment error, not a
    /// per-request error.
    #[error("OCR model assets missing at {path}")]
    ModelAssetsMissing { path: PathBuf },

    #[error("failed to read model asset {path}: {source}")]
    AssetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ONNX inference failed: {0}")]
    Inference(#[from] ort::Error),

    #[error("image preprocessing failed: {0}")]
    Preprocessing(String),

    /// The engine returned co-indexed arrays of different lengths. Always a
    /// contract violation, surfaced before any region is built.
    #[error(
        "engine output misaligned: {texts} texts, {scores} scores, {boxes} boxes, {polys} polygons"
    )]
    MisalignedOutput {
        texts: usize,
        scores: usize,
        boxes: usize,
        polys: usize,
    },

    #[error("OCR engine is closed")]
    EngineClosed,
}

// Session-builder calls carry the builder in the error's type parameter
// (`ort::Error<SessionBuilder>`); route them into the same `Inference`
// variant as every other ort error via ort's own conversion to `Error<()>`.
impl From<ort::Error<ort::session::builder::SessionBuilder>> for OcrError {
    fn from(err: ort::Error<ort::session::builder::SessionBuilder>) -> Self {
        OcrError::Inference(err.into())
    }
}

/// Translation orchestration errors
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation backend returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The backend returned a different number of results than requested.
    /// Never retried; positional pairing would be wrong.
    #[error("translation count mismatch: sent {sent} chunks, received {received}")]
    Misaligned { sent: usize, received: usize },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no translation API key configured (set DEEPL_API_KEY)")]
    MissingApiKey,

    #[error("detection threshold must be in [0.0, 1.0], got {0}")]
    InvalidDetThreshold(f32),

    #[error("invalid translation config: {0}")]
    InvalidTranslationConfig(String),
}

/// Pipeline orchestration errors
///
/// Each variant wraps one stage's error unmodified; the pipeline never
/// converts one stage's failure into another kind.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("image decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("OCR stage failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("translation stage failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("blocking task failed: {0}")]
    TaskJoin(String),
}

// Convenience type aliases for Results
pub type OcrResult<T> = Result<T, OcrError>;
pub type TranslationResult<T> = Result<T, TranslationError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
