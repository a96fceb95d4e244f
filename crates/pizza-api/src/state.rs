//! Application state.

use std::sync::Arc;

use pizza_media::{CountingPipeline, Detector, ObjectDetector};
use pizza_reports::ReportGenerator;
use pizza_storage::HistoryStore;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<CountingPipeline>,
    pub history: Arc<HistoryStore>,
    pub reports: ReportGenerator,
    /// Held for the whole process/append/report sequence of one upload;
    /// result files and cached reports are shared.
    pub processing: Arc<Mutex<()>>,
}

impl AppState {
    /// Create application state with the YOLOv8 detector from config.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let detector_config = config.detector_config();
        let detector = tokio::task::spawn_blocking(move || ObjectDetector::new(detector_config)).await??;
        Self::with_detector(config, Arc::new(detector))
    }

    /// Create application state around an already-built detector.
    pub fn with_detector(
        config: ApiConfig,
        detector: Arc<dyn Detector>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(&config.output_dir)?;
        let history = HistoryStore::open(&config.history_db_path)?;
        let reports = ReportGenerator::new(config.output_dir.clone());
        let pipeline = CountingPipeline::new(detector, config.pipeline_config());

        info!(
            output_dir = %config.output_dir.display(),
            history_db = %config.history_db_path.display(),
            "Application state ready"
        );

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            history: Arc::new(history),
            reports,
            processing: Arc::new(Mutex::new(())),
        })
    }
}
