pub mod grouping;
pub mod ocr;
pub mod translation;

// Re-export commonly used services
pub use ocr::{OcrEngine, OcrEngineRegistry};
pub use translation::{DeeplClient, TranslationOrchestrator};
