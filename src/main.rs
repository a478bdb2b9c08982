// HTTP entry point for the image-translation service

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use vision_translate::{
    core::errors::{PipelineError, TranslationError},
    core::types::{GroupingStrategy, TranslatedChunk},
    pipeline::Pipeline,
    services::ocr::OcrEngineRegistry,
    services::translation::{DeeplClient, TranslationOrchestrator},
    Config,
};

/// Content types accepted for upload. Anything else is rejected before the
/// pipeline runs.
const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/jpg"];

const DEFAULT_TARGET_LANG: &str = "EN";

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::new()?;

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "vision_translate={},ort=off",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== VISION TRANSLATION SERVICE ===");

    // Warm up the engine: a missing model-asset directory is a deployment
    // error and must abort startup, not fail the first request.
    let registry = Arc::new(OcrEngineRegistry::new(config.ocr.clone()));
    registry.get()?;

    let backend = Arc::new(DeeplClient::new(&config.translation)?);
    let orchestrator = TranslationOrchestrator::new(backend);
    let pipeline = Arc::new(Pipeline::new(Arc::clone(&registry), orchestrator));

    // Setup CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/vision/analyze", post(analyze))
        .with_state(AppState { pipeline })
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(cors);

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    info!("Server starting on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /health              - Health check");
    info!("  POST /api/vision/analyze  - Translate text in an image (multipart/form-data)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.close();
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(serde::Serialize)]
struct AnalyzeResponse {
    results: Vec<TranslatedChunk>,
}

/// Analyze endpoint
///
/// # Request Format:
/// - multipart/form-data
/// - Field "file": the image to analyze (JPEG/PNG)
/// - Field "target_lang" (optional): translation target language code
/// - Field "strategy" (optional): "per-segment" (default) or "page"
///
/// # Response:
/// JSON array of (source, translated) chunk pairs in reading order.
async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, (StatusCode, String)> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut target_lang = DEFAULT_TARGET_LANG.to_string();
    let mut strategy = GroupingStrategy::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let filename = field.file_name().map(str::to_string);

                if !is_accepted_upload(content_type.as_deref(), filename.as_deref()) {
                    return Err((
                        StatusCode::BAD_REQUEST,
                        "Unsupported file type.".to_string(),
                    ));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {}", e)))?;
                image_bytes = Some(data.to_vec());
            }
            "target_lang" => {
                target_lang = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {}", e)))?;
            }
            "strategy" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, format!("Read error: {}", e)))?;
                strategy = value
                    .parse()
                    .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
            }
            _ => {}
        }
    }

    let image_bytes = image_bytes
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No file provided".to_string()))?;

    let results = state
        .pipeline
        .run(image_bytes, &target_lang, strategy)
        .await
        .map_err(|e| {
            error!("Pipeline failed: {:?}", e);
            (error_status(&e), format!("Processing failed: {}", e))
        })?;

    Ok(Json(AnalyzeResponse { results }))
}

/// The upload gate: the declared content type must be an accepted image
/// type; when the client sent none, it is inferred from the filename.
fn is_accepted_upload(content_type: Option<&str>, filename: Option<&str>) -> bool {
    let mime = content_type
        .map(str::to_string)
        .or_else(|| filename.and_then(guess_mime));

    matches!(mime.as_deref(), Some(m) if ACCEPTED_MIME_TYPES.contains(&m))
}

fn guess_mime(filename: &str) -> Option<String> {
    match Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase()
        .as_str()
    {
        "jpg" | "jpeg" => Some("image/jpeg".to_string()),
        "png" => Some("image/png".to_string()),
        _ => None,
    }
}

fn error_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Decode(_) => StatusCode::BAD_REQUEST,
        PipelineError::Translation(TranslationError::Misaligned { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PipelineError::Translation(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision_translate::core::errors::DecodeError;

    #[test]
    fn declared_content_type_gates_uploads() {
        assert!(is_accepted_upload(Some("image/jpeg"), None));
        assert!(is_accepted_upload(Some("image/png"), Some("a.gif")));
        assert!(!is_accepted_upload(Some("application/pdf"), Some("a.png")));
        assert!(!is_accepted_upload(Some("text/plain"), None));
    }

    #[test]
    fn missing_content_type_falls_back_to_filename() {
        assert!(is_accepted_upload(None, Some("scan.PNG")));
        assert!(is_accepted_upload(None, Some("photo.jpeg")));
        assert!(!is_accepted_upload(None, Some("notes.txt")));
        assert!(!is_accepted_upload(None, None));
    }

    #[test]
    fn decode_errors_map_to_client_errors() {
        let decode = image::load_from_memory(b"junk").unwrap_err();
        let err = PipelineError::Decode(DecodeError(decode));
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);

        let err = PipelineError::Translation(TranslationError::Api {
            status: 429,
            body: String::new(),
        });
        assert_eq!(error_status(&err), StatusCode::BAD_GATEWAY);

        let err = PipelineError::Translation(TranslationError::Misaligned {
            sent: 2,
            received: 1,
        });
        assert_eq!(error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
