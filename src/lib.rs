// Library exports for the image-translation pipeline

pub mod core;
pub mod pipeline;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use crate::core::{
    config::Config,
    errors::{ConfigError, DecodeError, OcrError, PipelineError, TranslationError},
    types::{Chunk, GroupingStrategy, PixelGrid, RawPrediction, TextRegion, TranslatedChunk},
};

pub use crate::pipeline::Pipeline;

pub use crate::services::{
    grouping,
    ocr::{OcrEngine, OcrEngineRegistry, TextRecognizer},
    translation::{DeeplClient, TranslationBackend, TranslationOrchestrator},
};

pub use crate::utils::image_ops::decode_image;
