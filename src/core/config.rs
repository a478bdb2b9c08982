use crate::core::errors::ConfigError;
use std::env;
use std::path::PathBuf;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
}

/// OCR engine configuration
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Directory holding the text-detection model artifacts.
    pub det_model_dir: PathBuf,
    /// Directory holding the text-recognition model artifacts.
    pub rec_model_dir: PathBuf,
    /// Probability threshold for the detection map.
    pub det_threshold: f32,
    pub intra_threads: usize,
}

/// Translation backend configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        Ok(Self {
            server: ServerConfig {
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
            },
            ocr: OcrConfig {
                det_model_dir: env::var("DET_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("models/det")),
                rec_model_dir: env::var("REC_MODEL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("models/rec")),
                det_threshold: env::var("DET_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.3),
                intra_threads: env::var("OCR_INTRA_THREADS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| num_cpus::get().min(4)),
            },
            translation: TranslationConfig {
                api_url: env::var("DEEPL_API_URL")
                    .unwrap_or_else(|_| "https://api-free.deepl.com/v2/translate".to_string()),
                api_key: env::var("DEEPL_API_KEY").unwrap_or_default(),
                timeout_secs: env::var("TRANSLATE_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            },
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.ocr.det_threshold) {
            return Err(ConfigError::InvalidDetThreshold(self.ocr.det_threshold));
        }

        if self.translation.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if self.translation.timeout_secs == 0 {
            return Err(ConfigError::InvalidTranslationConfig(
                "TRANSLATE_TIMEOUT_SECONDS must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                port: 8000,
                host: "127.0.0.1".to_string(),
                log_level: Level::INFO,
            },
            ocr: OcrConfig {
                det_model_dir: PathBuf::from("models/det"),
                rec_model_dir: PathBuf::from("models/rec"),
                det_threshold: 0.3,
                intra_threads: 4,
            },
            translation: TranslationConfig {
                api_url: "https://api-free.deepl.com/v2/translate".to_string(),
                api_key: "test-key".to_string(),
                timeout_secs: 60,
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = base_config();
        config.ocr.det_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDetThreshold(_))
        ));
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let mut config = base_config();
        config.translation.api_key = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }
}
