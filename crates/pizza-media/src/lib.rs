//! Media handling for the pizza counter.
//!
//! This crate provides:
//! - Still image decoding and raw `rgb24` video frame streaming via FFmpeg
//! - YOLOv8 object detection through ONNX Runtime behind a `Detector` trait
//! - Bounding box annotation
//! - The counting pipeline (single detection for images, running maximum
//!   across frames for videos) and annotated output encoding

pub mod annotate;
pub mod command;
pub mod decode;
pub mod detection;
pub mod encode;
pub mod error;
pub mod pipeline;
pub mod probe;

pub use annotate::{annotate, TARGET_COLOR};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegProcess, STDERR_TAIL_BYTES};
pub use decode::{decode_image, FrameReader};
pub use detection::{Detection, Detector, ObjectDetector, ObjectDetectorConfig, COCO_CLASSES};
pub use encode::{FrameWriter, DEFAULT_VIDEO_CODEC};
pub use error::{MediaError, MediaResult};
pub use pipeline::{
    count_target, CountOutcome, CountingPipeline, MaxCount, PipelineConfig, RESULT_IMAGE,
    RESULT_VIDEO,
};
pub use probe::{probe_video, VideoInfo};
