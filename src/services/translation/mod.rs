// Chunk translation: one batched provider call per pipeline invocation,
// with positional source/target alignment.

pub mod deepl;

pub use deepl::DeeplClient;

use crate::core::errors::{TranslationError, TranslationResult};
use crate::core::types::{Chunk, TranslatedChunk};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Batched translation provider seam.
///
/// Implementations must return exactly one translated string per input
/// text, in the same order; the orchestrator enforces this and fails loudly
/// on any mismatch.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> Result<Vec<String>, TranslationError>;
}

pub struct TranslationOrchestrator {
    backend: Arc<dyn TranslationBackend>,
}

impl TranslationOrchestrator {
    pub fn new(backend: Arc<dyn TranslationBackend>) -> Self {
        Self { backend }
    }

    /// Translates the chunks in order, preserving count and position.
    ///
    /// Invariant: a zero-length batch is never sent to the backend; empty
    /// input short-circuits to empty output. Backend failures surface
    /// unmodified; a count mismatch fails with
    /// [`TranslationError::Misaligned`] and no partial pairs are returned.
    pub async fn translate(
        &self,
        chunks: Vec<Chunk>,
        target_lang: &str,
    ) -> TranslationResult<Vec<TranslatedChunk>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.as_str().to_string()).collect();
        let translated = self.backend.translate_batch(&texts, target_lang).await?;

        if translated.len() != chunks.len() {
            return Err(TranslationError::Misaligned {
                sent: chunks.len(),
                received: translated.len(),
            });
        }

        debug!("translated {} chunks to {}", chunks.len(), target_lang);

        Ok(chunks
            .into_iter()
            .zip(translated)
            .map(|(source, translated)| TranslatedChunk { source, translated })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend double: counts calls and replies with a canned response.
    struct StubBackend {
        calls: AtomicUsize,
        response: Mutex<Result<Vec<String>, TranslationError>>,
    }

    impl StubBackend {
        fn returning(response: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Ok(response)),
            })
        }

        fn failing(error: TranslationError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Err(error)),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranslationBackend for StubBackend {
        async fn translate_batch(
            &self,
            _texts: &[String],
            _target_lang: &str,
        ) -> Result<Vec<String>, TranslationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::mem::replace(
                &mut *self.response.lock(),
                Err(TranslationError::Misaligned {
                    sent: 0,
                    received: 0,
                }),
            )
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().map(|t| Chunk(t.to_string())).collect()
    }

    #[tokio::test]
    async fn empty_input_returns_empty_without_calling_backend() {
        let backend = StubBackend::returning(vec![]);
        let orchestrator = TranslationOrchestrator::new(backend.clone());

        let result = orchestrator.translate(Vec::new(), "KO").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn translations_are_zipped_positionally() {
        let backend = StubBackend::returning(vec!["세계".into(), "안녕".into()]);
        let orchestrator = TranslationOrchestrator::new(backend.clone());

        let result = orchestrator
            .translate(chunks(&["World", "Hi"]), "KO")
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].source, Chunk("World".into()));
        assert_eq!(result[0].translated, "세계");
        assert_eq!(result[1].source, Chunk("Hi".into()));
        assert_eq!(result[1].translated, "안녕");
    }

    #[tokio::test]
    async fn count_mismatch_fails_with_no_partial_pairs() {
        let backend = StubBackend::returning(vec!["only one".into()]);
        let orchestrator = TranslationOrchestrator::new(backend);

        let err = orchestrator
            .translate(chunks(&["a", "b", "c"]), "KO")
            .await
            .unwrap_err();

        match err {
            TranslationError::Misaligned { sent, received } => {
                assert_eq!(sent, 3);
                assert_eq!(received, 1);
            }
            other => panic!("expected Misaligned, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn backend_errors_surface_unmodified() {
        let backend = StubBackend::failing(TranslationError::Api {
            status: 456,
            body: "quota exceeded".into(),
        });
        let orchestrator = TranslationOrchestrator::new(backend);

        let err = orchestrator.translate(chunks(&["a"]), "KO").await.unwrap_err();
        assert!(matches!(err, TranslationError::Api { status: 456, .. }));
    }
}
