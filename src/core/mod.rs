pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{ConfigError, DecodeError, OcrError, PipelineError, TranslationError};
pub use types::{
    Chunk, GroupingStrategy, PixelGrid, RawPrediction, TextRegion, TranslatedChunk,
};
