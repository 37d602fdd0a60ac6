//! Shared data models for the mpface pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Detector output (landmarks, blendshape categories, head-pose transforms)
//! - The fixed 52-column blendshape schema and tabular rows
//! - Per-frame structured records
//! - Sink, detector and overlay configuration

pub mod blendshape;
pub mod config;
pub mod detection;
pub mod overlay;
pub mod pattern;
pub mod record;

// Re-export common types
pub use blendshape::{
    format_offset, format_score, BlendshapeRow, BLENDSHAPE_CATEGORIES, BLENDSHAPE_COUNT,
    CSV_DELIMITER, CSV_LINE_TERMINATOR,
};
pub use config::{ConfigError, DetectorOptions, SinkConfig};
pub use detection::{Category, DetectionResult, FaceResult, Landmark};
pub use overlay::OverlayStyle;
pub use pattern::{FilenamePattern, PatternError};
pub use record::{FaceRecord, StructuredRecord};
