// Pipeline composition: decode → OCR → group → translate.
//
// Each stage's failure propagates wrapped only with stage identity; partial
// results are never returned. CPU-bound stages run on the blocking pool so
// the async runtime is not starved.

use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::{GroupingStrategy, TranslatedChunk};
use crate::services::grouping;
use crate::services::ocr::OcrEngineRegistry;
use crate::services::translation::TranslationOrchestrator;
use crate::utils::image_ops;
use std::sync::Arc;
use tracing::debug;

pub struct Pipeline {
    registry: Arc<OcrEngineRegistry>,
    orchestrator: TranslationOrchestrator,
}

impl Pipeline {
    pub fn new(registry: Arc<OcrEngineRegistry>, orchestrator: TranslationOrchestrator) -> Self {
        Self {
            registry,
            orchestrator,
        }
    }

    /// Runs the full pipeline on one uploaded image.
    ///
    /// Within one invocation, chunk order is preserved end-to-end from
    /// grouping through translated output.
    pub async fn run(
        &self,
        image_bytes: Vec<u8>,
        target_lang: &str,
        strategy: GroupingStrategy,
    ) -> PipelineResult<Vec<TranslatedChunk>> {
        let grid = tokio::task::spawn_blocking(move || image_ops::decode_image(&image_bytes))
            .await
            .map_err(|e| PipelineError::TaskJoin(e.to_string()))??;

        let engine = self.registry.get()?;
        let regions = tokio::task::spawn_blocking(move || engine.predict(&grid))
            .await
            .map_err(|e| PipelineError::TaskJoin(e.to_string()))??;

        let sorted = grouping::sort_regions(regions);
        let chunks = grouping::group_regions(&sorted, strategy);
        debug!(
            "grouped {} regions into {} chunks ({:?})",
            sorted.len(),
            chunks.len(),
            strategy
        );

        let translated = self.orchestrator.translate(chunks, target_lang).await?;
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{OcrError, TranslationError};
    use crate::core::types::{Chunk, PixelGrid, RawPrediction};
    use crate::services::ocr::{OcrEngine, TextRecognizer};
    use crate::services::translation::TranslationBackend;
    use async_trait::async_trait;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    struct StubRecognizer {
        raw: RawPrediction,
    }

    impl TextRecognizer for StubRecognizer {
        fn predict(&mut self, _image: &PixelGrid) -> Result<RawPrediction, OcrError> {
            Ok(self.raw.clone())
        }
    }

    struct MappingBackend;

    #[async_trait]
    impl TranslationBackend for MappingBackend {
        async fn translate_batch(
            &self,
            texts: &[String],
            _target_lang: &str,
        ) -> Result<Vec<String>, TranslationError> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "World" => "세계".to_string(),
                    "Hi" => "안녕".to_string(),
                    other => other.to_string(),
                })
                .collect())
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn registry_with(raw: RawPrediction) -> Arc<OcrEngineRegistry> {
        Arc::new(OcrEngineRegistry::with_builder(Box::new(move || {
            Ok(OcrEngine::from_recognizer(Box::new(StubRecognizer {
                raw: raw.clone(),
            })))
        })))
    }

    #[tokio::test]
    async fn pipeline_orders_regions_and_aligns_translations() {
        // "Hi" sits below "World"; reading order must flip them.
        let raw = RawPrediction {
            rec_texts: vec!["Hi".into(), "World".into()],
            rec_scores: vec![0.9, 0.9],
            rec_boxes: vec![[10, 50, 40, 60], [10, 10, 40, 20]],
            rec_polys: vec![
                vec![[10, 50], [40, 50], [40, 60], [10, 60]],
                vec![[10, 10], [40, 10], [40, 20], [10, 20]],
            ],
        };

        let pipeline = Pipeline::new(
            registry_with(raw),
            TranslationOrchestrator::new(Arc::new(MappingBackend)),
        );

        let result = pipeline
            .run(png_bytes(), "KO", GroupingStrategy::PerSegment)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].source, Chunk("World".into()));
        assert_eq!(result[0].translated, "세계");
        assert_eq!(result[1].source, Chunk("Hi".into()));
        assert_eq!(result[1].translated, "안녕");
    }

    #[tokio::test]
    async fn pipeline_with_no_text_skips_translation() {
        let pipeline = Pipeline::new(
            registry_with(RawPrediction::default()),
            TranslationOrchestrator::new(Arc::new(MappingBackend)),
        );

        let result = pipeline
            .run(png_bytes(), "KO", GroupingStrategy::Page)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn decode_failure_maps_to_decode_error() {
        let pipeline = Pipeline::new(
            registry_with(RawPrediction::default()),
            TranslationOrchestrator::new(Arc::new(MappingBackend)),
        );

        let err = pipeline
            .run(b"not an image".to_vec(), "KO", GroupingStrategy::PerSegment)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[tokio::test]
    async fn engine_failure_maps_to_ocr_error() {
        let registry = Arc::new(OcrEngineRegistry::with_builder(Box::new(|| {
            Err(OcrError::ModelAssetsMissing {
                path: "models/det".into(),
            })
        })));
        let pipeline = Pipeline::new(
            registry,
            TranslationOrchestrator::new(Arc::new(MappingBackend)),
        );

        let err = pipeline
            .run(png_bytes(), "KO", GroupingStrategy::PerSegment)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Ocr(OcrError::ModelAssetsMissing { .. })
        ));
    }
}
