//! Sink and detector configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

use crate::pattern::{FilenamePattern, PatternError};

/// Configuration error. Always raised before any output is opened.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required option: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid filename pattern for {name}: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: PatternError,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Annotated video must be an .mp4 file: {0}")]
    VideoContainer(PathBuf),

    #[error("Failed to read config file {path}: {message}")]
    File { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
        }
    }
}

/// Options forwarded to the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DetectorOptions {
    /// Maximum number of faces to detect
    #[validate(range(min = 1))]
    pub num_faces: u32,
    /// Minimum confidence for the face detection to be considered successful
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_face_detection_confidence: f32,
    /// Minimum confidence of face presence in landmark detection
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_face_presence_confidence: f32,
    /// Minimum confidence for face tracking between frames
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_tracking_confidence: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            num_faces: 1,
            min_face_detection_confidence: 0.5,
            min_face_presence_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl DetectorOptions {
    /// Command-line flags passed to a detector process.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--num-faces".to_string(),
            self.num_faces.to_string(),
            "--min-face-detection-confidence".to_string(),
            self.min_face_detection_confidence.to_string(),
            "--min-face-presence-confidence".to_string(),
            self.min_face_presence_confidence.to_string(),
            "--min-tracking-confidence".to_string(),
            self.min_tracking_confidence.to_string(),
        ]
    }
}

/// Which outputs are produced. Every sink is independent; `None` disables it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Blendshape score file
    pub csv: Option<PathBuf>,
    /// Per-frame JSON dump pattern
    pub json_pattern: Option<FilenamePattern>,
    /// Annotated video file
    pub video: Option<PathBuf>,
    /// Per-frame annotated image pattern
    pub frame_pattern: Option<FilenamePattern>,
}

impl SinkConfig {
    /// Whether any sink needs annotated frames.
    pub fn renders_frames(&self) -> bool {
        self.video.is_some() || self.frame_pattern.is_some()
    }

    /// Whether no sink is enabled.
    pub fn is_empty(&self) -> bool {
        self.csv.is_none()
            && self.json_pattern.is_none()
            && self.video.is_none()
            && self.frame_pattern.is_none()
    }

    /// Check sink-level constraints.
    pub fn check(&self) -> Result<(), ConfigError> {
        if let Some(video) = &self.video {
            if !has_extension(video, "mp4") {
                return Err(ConfigError::VideoContainer(video.clone()));
            }
        }
        Ok(())
    }
}

/// Parse an optional pattern value, treating `NA` and empty as disabled.
pub fn parse_optional_pattern(
    name: &'static str,
    value: Option<&str>,
) -> Result<Option<FilenamePattern>, ConfigError> {
    match disabled_or(value) {
        None => Ok(None),
        Some(v) => FilenamePattern::parse(v)
            .map(Some)
            .map_err(|source| ConfigError::Pattern { name, source }),
    }
}

/// Parse an optional path value, treating `NA` and empty as disabled.
pub fn parse_optional_path(value: Option<&str>) -> Option<PathBuf> {
    disabled_or(value).map(PathBuf::from)
}

fn disabled_or(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("NA"))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}
