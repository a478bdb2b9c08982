// OCR engine: serialized inference over a shared detect+recognize model.
//
// The loaded model is the only shared mutable resource in the pipeline. It
// is guarded by a single mutex whose scope is exactly the inference call;
// decoding and post-processing happen outside the lock.

pub mod model;

use crate::core::config::OcrConfig;
use crate::core::errors::{OcrError, OcrResult};
use crate::core::types::{PixelGrid, RawPrediction, TextRegion};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque detect+recognize capability: one call turns a pixel grid into the
/// raw co-indexed arrays described by [`crate::core::types::RawPrediction`].
///
/// The model is not assumed reentrant; [`OcrEngine`] serializes calls.
pub trait TextRecognizer: Send {
    fn predict(&mut self, image: &PixelGrid) -> Result<RawPrediction, OcrError>;
}

/// Shared OCR engine wrapping the loaded model behind an inference lock.
pub struct OcrEngine {
    model: Mutex<Option<Box<dyn TextRecognizer>>>,
}

impl OcrEngine {
    /// Loads the model from the configured asset directories.
    ///
    /// Both directories must exist up front; a missing directory is a
    /// deployment error and fails with [`OcrError::ModelAssetsMissing`]
    /// before any session is built.
    pub fn load(config: &OcrConfig) -> OcrResult<Self> {
        for dir in [&config.det_model_dir, &config.rec_model_dir] {
            if !dir.is_dir() {
                return Err(OcrError::ModelAssetsMissing { path: dir.clone() });
            }
        }

        let model = model::PaddleModel::load(config)?;
        info!(
            "OCR engine initialized (det: {}, rec: {})",
            config.det_model_dir.display(),
            config.rec_model_dir.display()
        );

        Ok(Self::from_recognizer(Box::new(model)))
    }

    pub(crate) fn from_recognizer(model: Box<dyn TextRecognizer>) -> Self {
        Self {
            model: Mutex::new(Some(model)),
        }
    }

    /// Runs one inference and returns the recognized regions.
    ///
    /// At most one caller executes the model at a time; others block here.
    /// Validation of the raw arrays and region construction run after the
    /// lock is released.
    pub fn predict(&self, image: &PixelGrid) -> OcrResult<Vec<TextRegion>> {
        let raw = {
            let mut guard = self.model.lock();
            let model = guard.as_mut().ok_or(OcrError::EngineClosed)?;
            model.predict(image)?
        };

        let regions = raw.into_regions()?;
        debug!("OCR produced {} regions", regions.len());
        Ok(regions)
    }

    /// Releases the model. Meant for process shutdown; `predict` afterwards
    /// fails with [`OcrError::EngineClosed`].
    pub fn close(&self) {
        if self.model.lock().take().is_some() {
            info!("OCR engine closed, model resources released");
        }
    }
}

type EngineBuilder = Box<dyn Fn() -> OcrResult<OcrEngine> + Send + Sync>;

/// Process-wide lifecycle wrapper for the engine.
///
/// The model is expensive to load, so it is constructed at most once and
/// shared by every request. Concurrent first calls to [`get`] race on a
/// one-time-initialization cell: exactly one builder run wins, the rest
/// receive the same instance.
///
/// [`get`]: OcrEngineRegistry::get
pub struct OcrEngineRegistry {
    cell: OnceCell<Arc<OcrEngine>>,
    build: EngineBuilder,
}

impl OcrEngineRegistry {
    pub fn new(config: OcrConfig) -> Self {
        Self::with_builder(Box::new(move || OcrEngine::load(&config)))
    }

    pub(crate) fn with_builder(build: EngineBuilder) -> Self {
        Self {
            cell: OnceCell::new(),
            build,
        }
    }

    /// Returns the shared engine, constructing it on first access.
    pub fn get(&self) -> OcrResult<Arc<OcrEngine>> {
        self.cell
            .get_or_try_init(|| (self.build)().map(Arc::new))
            .map(Arc::clone)
    }

    /// Tears down the engine if it was ever constructed. Shutdown-time only.
    pub fn close(&self) {
        if let Some(engine) = self.cell.get() {
            engine.close();
        }
    }
}
