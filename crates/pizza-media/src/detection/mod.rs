//! Object detection.
//!
//! Provides the `Detector` seam used by the counting pipeline and the
//! YOLOv8 ONNX implementation behind it.

pub mod object_detector;

use image::RgbImage;

use crate::error::MediaResult;

pub use object_detector::{ObjectDetector, ObjectDetectorConfig};

/// Detected object with bounding box and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box in normalized coordinates [0, 1]
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// COCO class ID (0 = person, 53 = pizza, etc.)
    pub class_id: usize,
    /// Detection confidence [0, 1]
    pub confidence: f32,
}

impl Detection {
    /// Check if this detection belongs to `class_id`.
    pub fn is_class(&self, class_id: usize) -> bool {
        self.class_id == class_id
    }

    /// COCO label for this detection, if the id is known.
    pub fn class_name(&self) -> Option<&'static str> {
        COCO_CLASSES.get(self.class_id).copied()
    }

    /// Get the center point in normalized coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get area (normalized).
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Intersection over Union with another detection.
    pub fn iou(&self, other: &Detection) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// A pretrained detector run on one frame at a time.
///
/// Implementations must be shareable across requests; the production
/// detector serializes access to its inference session internally.
pub trait Detector: Send + Sync {
    /// Detect objects in an RGB frame.
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>>;
}

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];
