//! Shared data models for the pizza counter.
//!
//! This crate provides Serde-serializable types for:
//! - Upload media classification
//! - Persisted history records
//! - `/process` response bodies

pub mod history;
pub mod media_type;
pub mod response;

pub use history::{format_timestamp, parse_timestamp, HistoryRecord, TimestampParseError, TIMESTAMP_FORMAT};
pub use media_type::{MediaType, MediaTypeParseError, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
pub use response::{ErrorResponse, ProcessResponse};

/// COCO class id of the counted category.
pub const PIZZA_CLASS_ID: usize = 53;

/// Human-readable name of the counted category.
pub const PIZZA_CLASS_NAME: &str = "pizza";
