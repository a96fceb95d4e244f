//! Object detection using a YOLOv8 ONNX model.
//!
//! Execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::ArrayView2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use super::{Detection, Detector, COCO_CLASSES};
use crate::error::{MediaError, MediaResult};

/// Configuration for object detection.
#[derive(Debug, Clone)]
pub struct ObjectDetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Base confidence threshold applied to every detection
    pub confidence_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for ObjectDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolov8n.onnx".to_string(),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// Object detector using a YOLOv8 ONNX model.
pub struct ObjectDetector {
    session: Mutex<Session>,
    config: ObjectDetectorConfig,
}

impl ObjectDetector {
    /// Create a new object detector from config.
    ///
    /// Returns error if model file doesn't exist or cannot be loaded.
    pub fn new(config: ObjectDetectorConfig) -> MediaResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(MediaError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            confidence_threshold = config.confidence_threshold,
            "Object detector initialized"
        );

        Ok(Self { session, config })
    }

    /// Resize to the model input, normalize to [0, 1] and lay out as NCHW.
    fn preprocess(&self, frame: &RgbImage) -> MediaResult<Value> {
        let input_size = self.config.input_size;

        let resized = image::imageops::resize(
            frame,
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let (w, h) = (input_size as usize, input_size as usize);
        let mut chw_data: Vec<f32> = vec![0.0; 3 * h * w];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let offset = y as usize * w + x as usize;
            for c in 0..3 {
                chw_data[c * h * w + offset] = pixel[c] as f32 / 255.0;
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("Failed to create tensor: {}", e)))
    }

    /// Run ONNX inference and return the flat `output0` tensor.
    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl Detector for ObjectDetector {
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let detections = decode_predictions(
            &outputs,
            COCO_CLASSES.len(),
            self.config.confidence_threshold,
            self.config.nms_threshold,
            self.config.input_size as f32,
        )?;

        debug!(count = detections.len(), "Object detection completed");
        Ok(detections)
    }
}

/// Decode a YOLOv8 head output into normalized detections.
///
/// The layout is `[1, 4 + num_classes, num_boxes]`: rows 0..4 hold the box in
/// center format (model pixels), the remaining rows hold per-class scores.
/// Each candidate takes its best class, is dropped below
/// `confidence_threshold`, and survivors go through per-class NMS.
pub fn decode_predictions(
    outputs: &[f32],
    num_classes: usize,
    confidence_threshold: f32,
    nms_threshold: f32,
    input_size: f32,
) -> MediaResult<Vec<Detection>> {
    let num_features = 4 + num_classes;
    if outputs.is_empty() || outputs.len() % num_features != 0 {
        return Err(MediaError::detection_failed(format!(
            "Unexpected output size {} for {} features",
            outputs.len(),
            num_features
        )));
    }
    let num_boxes = outputs.len() / num_features;

    let predictions = ArrayView2::from_shape((num_features, num_boxes), outputs)
        .map_err(|e| MediaError::internal(format!("Failed to reshape output: {}", e)))?;

    let mut candidates = Vec::new();
    for column in predictions.columns() {
        let (best_class, best_score) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (c, s)| if s > best.1 { (c, s) } else { best });

        if best_score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);

        // Model pixels -> normalized, clamped to the frame
        let x = ((cx - w / 2.0) / input_size).clamp(0.0, 1.0);
        let y = ((cy - h / 2.0) / input_size).clamp(0.0, 1.0);
        let width = (w / input_size).min(1.0 - x).max(0.0);
        let height = (h / input_size).min(1.0 - y).max(0.0);

        candidates.push(Detection {
            x,
            y,
            width,
            height,
            class_id: best_class,
            confidence: best_score,
        });
    }

    Ok(non_maximum_suppression(candidates, nms_threshold))
}

/// Per-class Non-Maximum Suppression, highest confidence first.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}
