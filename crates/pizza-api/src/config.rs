//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;

use pizza_media::{ObjectDetectorConfig, PipelineConfig, DEFAULT_VIDEO_CODEC};
use pizza_models::PIZZA_CLASS_ID;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Annotated results, cached reports and temporary uploads
    pub output_dir: PathBuf,
    pub history_db_path: PathBuf,
    /// YOLOv8 ONNX model
    pub model_path: String,
    pub target_class: usize,
    pub detector_confidence: f32,
    pub detector_nms: f32,
    pub detector_input_size: u32,
    /// Counting floor for still images, on top of `detector_confidence`
    pub image_min_confidence: Option<f32>,
    /// Counting floor for video frames, on top of `detector_confidence`
    pub video_min_confidence: Option<f32>,
    pub video_codec: String,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        let detector = ObjectDetectorConfig::default();

        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 512 * 1024 * 1024, // 512MB
            environment: "development".to_string(),
            output_dir: pipeline.output_dir,
            history_db_path: PathBuf::from("history.db"),
            model_path: detector.model_path,
            target_class: PIZZA_CLASS_ID,
            detector_confidence: detector.confidence_threshold,
            detector_nms: detector.nms_threshold,
            detector_input_size: detector.input_size,
            image_min_confidence: pipeline.image_min_confidence,
            video_min_confidence: pipeline.video_min_confidence,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_or("API_PORT", defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: env_or("MAX_BODY_SIZE", defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            history_db_path: std::env::var("HISTORY_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_db_path),
            model_path: std::env::var("MODEL_PATH").unwrap_or(defaults.model_path),
            target_class: env_or("TARGET_CLASS_ID", defaults.target_class),
            detector_confidence: env_or("DETECTOR_CONFIDENCE", defaults.detector_confidence),
            detector_nms: env_or("DETECTOR_NMS", defaults.detector_nms),
            detector_input_size: env_or("DETECTOR_INPUT_SIZE", defaults.detector_input_size),
            image_min_confidence: match std::env::var("IMAGE_MIN_CONFIDENCE") {
                Ok(v) => parse_confidence_floor(&v),
                Err(_) => defaults.image_min_confidence,
            },
            video_min_confidence: match std::env::var("VIDEO_MIN_CONFIDENCE") {
                Ok(v) => parse_confidence_floor(&v),
                Err(_) => defaults.video_min_confidence,
            },
            video_codec: std::env::var("VIDEO_CODEC").unwrap_or(defaults.video_codec),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            output_dir: self.output_dir.clone(),
            target_class: self.target_class,
            image_min_confidence: self.image_min_confidence,
            video_min_confidence: self.video_min_confidence,
            video_codec: self.video_codec.clone(),
        }
    }

    pub fn detector_config(&self) -> ObjectDetectorConfig {
        ObjectDetectorConfig {
            model_path: self.model_path.clone(),
            confidence_threshold: self.detector_confidence,
            nms_threshold: self.detector_nms,
            input_size: self.detector_input_size,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse a counting floor; empty, `none` or `off` disables it.
fn parse_confidence_floor(value: &str) -> Option<f32> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") || value.eq_ignore_ascii_case("off") {
        return None;
    }
    value.parse().ok()
}
