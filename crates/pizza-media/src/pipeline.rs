//! Counting pipeline.
//!
//! Still images are detected once; videos are decoded frame by frame and
//! the reported count is the largest per-frame count seen, since the same
//! pizza stays in view across consecutive frames.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use metrics::{counter, histogram};
use pizza_models::{MediaType, PIZZA_CLASS_ID};
use tracing::{debug, info};

use crate::annotate::annotate;
use crate::decode::{decode_image, FrameReader};
use crate::detection::{Detection, Detector};
use crate::encode::{FrameWriter, DEFAULT_VIDEO_CODEC};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;

/// File name of the latest annotated image.
pub const RESULT_IMAGE: &str = "result.jpg";
/// File name of the latest annotated video.
pub const RESULT_VIDEO: &str = "result.mp4";

/// Default confidence floor for counting in video frames.
pub const DEFAULT_VIDEO_MIN_CONFIDENCE: f32 = 0.3;

const FRAMES_PROCESSED_TOTAL: &str = "pizza_video_frames_processed_total";
const PIPELINE_DURATION_SECONDS: &str = "pizza_pipeline_duration_seconds";

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory receiving annotated results and temporary uploads
    pub output_dir: PathBuf,
    pub target_class: usize,
    /// Extra confidence floor for still images (`None` counts every
    /// detection the model returns)
    pub image_min_confidence: Option<f32>,
    /// Extra confidence floor for video frames; detections must exceed it
    pub video_min_confidence: Option<f32>,
    pub video_codec: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("static"),
            target_class: PIZZA_CLASS_ID,
            image_min_confidence: None,
            video_min_confidence: Some(DEFAULT_VIDEO_MIN_CONFIDENCE),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
        }
    }
}

/// Result of processing one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CountOutcome {
    pub count: u32,
    pub media_type: MediaType,
    /// Annotated output written to the output directory
    pub result_path: PathBuf,
    /// Frames examined (1 for images)
    pub frames: u64,
}

/// Count detections of `target_class`, optionally above a confidence floor.
///
/// The floor is strict: a detection at exactly `min_confidence` is ignored.
pub fn count_target(detections: &[Detection], target_class: usize, min_confidence: Option<f32>) -> u32 {
    detections
        .iter()
        .filter(|d| d.is_class(target_class))
        .filter(|d| min_confidence.map_or(true, |floor| d.confidence > floor))
        .count() as u32
}

/// Running maximum of per-frame counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaxCount {
    max: u32,
    frames: u64,
}

impl MaxCount {
    pub fn observe(&mut self, count: u32) {
        self.max = self.max.max(count);
        self.frames += 1;
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Detect, count and annotate uploads.
///
/// Holds the long-lived detector handle; construct once at startup.
pub struct CountingPipeline {
    detector: Arc<dyn Detector>,
    config: PipelineConfig,
}

impl CountingPipeline {
    pub fn new(detector: Arc<dyn Detector>, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    /// Dispatch an upload on its file name.
    ///
    /// Unsupported extensions fail before anything is decoded or written.
    pub async fn process(&self, filename: &str, bytes: Vec<u8>) -> MediaResult<CountOutcome> {
        let media_type =
            MediaType::from_filename(filename).ok_or_else(|| MediaError::unsupported_type(filename))?;

        let start = Instant::now();
        let outcome = match media_type {
            MediaType::Image => self.process_image(bytes).await?,
            MediaType::Video => {
                let ext = Path::new(filename)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("mp4")
                    .to_lowercase();
                self.process_video(&bytes, &ext).await?
            }
        };

        histogram!(PIPELINE_DURATION_SECONDS, "type" => media_type.as_str())
            .record(start.elapsed().as_secs_f64());
        info!(
            filename,
            media_type = %outcome.media_type,
            count = outcome.count,
            frames = outcome.frames,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload processed"
        );

        Ok(outcome)
    }

    /// Count the target class in a still image and save the annotated copy.
    pub async fn process_image(&self, bytes: Vec<u8>) -> MediaResult<CountOutcome> {
        let detector = Arc::clone(&self.detector);
        let target_class = self.config.target_class;
        let min_confidence = self.config.image_min_confidence;
        let result_path = self.config.output_dir.join(RESULT_IMAGE);
        let save_path = result_path.clone();

        let count = tokio::task::spawn_blocking(move || -> MediaResult<u32> {
            let mut frame = decode_image(&bytes)?;
            let detections = detector.detect(&frame)?;

            for d in &detections {
                debug!(
                    class_id = d.class_id,
                    name = d.class_name().unwrap_or("unknown"),
                    confidence = d.confidence,
                    "Detected box"
                );
            }

            let count = count_target(&detections, target_class, min_confidence);
            annotate(&mut frame, &detections, target_class);
            frame.save(&save_path)?;
            Ok(count)
        })
        .await
        .map_err(|e| MediaError::internal(format!("Image task failed: {}", e)))??;

        Ok(CountOutcome {
            count,
            media_type: MediaType::Image,
            result_path,
            frames: 1,
        })
    }

    /// Count the target class across every frame of a video.
    ///
    /// The upload is spooled to a temporary file next to the results and
    /// removed once processing ends, successfully or not.
    pub async fn process_video(&self, bytes: &[u8], ext: &str) -> MediaResult<CountOutcome> {
        let upload = tempfile::Builder::new()
            .prefix("temp_video")
            .suffix(&format!(".{}", ext))
            .tempfile_in(&self.config.output_dir)?;
        tokio::fs::write(upload.path(), bytes).await?;

        let info = probe_video(upload.path()).await?;
        debug!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            codec = %info.codec,
            "Video probed"
        );

        let result_path = self.config.output_dir.join(RESULT_VIDEO);
        let mut reader = FrameReader::open(upload.path(), &info)?;
        let mut writer = FrameWriter::create(&result_path, &info, &self.config.video_codec)?;
        let mut tally = MaxCount::default();

        while let Some(frame) = reader.next_frame().await? {
            let (frame, count) = self.count_frame(frame).await?;
            tally.observe(count);
            writer.write_frame(&frame).await?;
        }

        reader.finish().await?;
        writer.finish().await?;
        counter!(FRAMES_PROCESSED_TOTAL).increment(tally.frames());

        Ok(CountOutcome {
            count: tally.max(),
            media_type: MediaType::Video,
            result_path,
            frames: tally.frames(),
        })
    }

    /// Detect, count and annotate one video frame off the async runtime.
    async fn count_frame(&self, mut frame: RgbImage) -> MediaResult<(RgbImage, u32)> {
        let detector = Arc::clone(&self.detector);
        let target_class = self.config.target_class;
        let min_confidence = self.config.video_min_confidence;

        tokio::task::spawn_blocking(move || -> MediaResult<(RgbImage, u32)> {
            let detections = detector.detect(&frame)?;
            let count = count_target(&detections, target_class, min_confidence);
            annotate(&mut frame, &detections, target_class);
            Ok((frame, count))
        })
        .await
        .map_err(|e| MediaError::internal(format!("Frame task failed: {}", e)))?
    }
}
