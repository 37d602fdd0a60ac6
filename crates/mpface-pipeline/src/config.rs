//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use mpface_media::DEFAULT_VIDEO_CODEC;
use mpface_models::config::{parse_optional_path, parse_optional_pattern};
use mpface_models::{ConfigError, DetectorOptions, OverlayStyle, SinkConfig};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::sinks::frame_format;

/// Program run as the landmarker sidecar when none is configured.
pub const DEFAULT_DETECTOR_COMMAND: &str = "mpface-landmarker";

/// Frames between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Complete configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input video
    pub input: PathBuf,
    /// Options forwarded to the detector
    #[validate(nested)]
    pub detector: DetectorOptions,
    /// Enabled outputs
    pub sinks: SinkConfig,
    /// Overlay passes on annotated frames
    pub overlay: OverlayStyle,
    /// Landmarker sidecar program and arguments
    pub detector_command: Vec<String>,
    /// FFmpeg encoder for the annotated video
    pub video_codec: String,
    /// Frames between progress log lines
    #[validate(range(min = 1))]
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            detector: DetectorOptions::default(),
            sinks: SinkConfig::default(),
            overlay: OverlayStyle::default(),
            detector_command: vec![DEFAULT_DETECTOR_COMMAND.to_string()],
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// Create config from `MPFACE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let input = var("MPFACE_INPUT")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("MPFACE_INPUT"))?;

        let detector = DetectorOptions {
            num_faces: parse_var(&var, "MPFACE_NUM_FACES")?
                .unwrap_or(defaults.detector.num_faces),
            min_face_detection_confidence: parse_var(&var, "MPFACE_MIN_DETECTION_CONFIDENCE")?
                .unwrap_or(defaults.detector.min_face_detection_confidence),
            min_face_presence_confidence: parse_var(&var, "MPFACE_MIN_PRESENCE_CONFIDENCE")?
                .unwrap_or(defaults.detector.min_face_presence_confidence),
            min_tracking_confidence: parse_var(&var, "MPFACE_MIN_TRACKING_CONFIDENCE")?
                .unwrap_or(defaults.detector.min_tracking_confidence),
        };

        let sinks = SinkConfig {
            csv: parse_optional_path(lookup("MPFACE_CSV").as_deref()),
            json_pattern: parse_optional_pattern(
                "MPFACE_JSON_PATTERN",
                lookup("MPFACE_JSON_PATTERN").as_deref(),
            )?,
            video: parse_optional_path(lookup("MPFACE_VIDEO").as_deref()),
            frame_pattern: parse_optional_pattern(
                "MPFACE_FRAME_PATTERN",
                lookup("MPFACE_FRAME_PATTERN").as_deref(),
            )?,
        };

        let overlay = OverlayStyle::new(
            parse_flag(&var, "MPFACE_TESSELATION")?.unwrap_or(false),
            parse_flag(&var, "MPFACE_CONTOURS")?.unwrap_or(false),
            parse_flag(&var, "MPFACE_IRISES")?.unwrap_or(false),
        );

        let detector_command = var("MPFACE_DETECTOR_COMMAND")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or(defaults.detector_command);

        let config = Self {
            input,
            detector,
            sinks,
            overlay,
            detector_command,
            video_codec: var("MPFACE_VIDEO_CODEC").unwrap_or(defaults.video_codec),
            progress_interval: parse_var(&var, "MPFACE_PROGRESS_INTERVAL")?
                .unwrap_or(defaults.progress_interval),
        };
        config.validate_config()?;
        Ok(config)
    }

    /// Load config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_error = |message: String| ConfigError::File {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))?;
        config.validate_config()?;
        Ok(config)
    }

    /// Check every constraint before anything is opened.
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::Missing("input"));
        }
        self.validate()?;
        self.sinks.check()?;
        if let Some(pattern) = &self.sinks.frame_pattern {
            if frame_format(pattern.render(0)).is_none() {
                return Err(ConfigError::invalid("frame_pattern", pattern.as_str()));
            }
        }
        if self.detector_command.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Missing("detector_command"));
        }
        if self.video_codec.trim().is_empty() {
            return Err(ConfigError::invalid("video_codec", self.video_codec.clone()));
        }
        Ok(())
    }

    /// Full detector command line: the configured program followed by the
    /// detector options as flags.
    pub fn detector_invocation(&self) -> Vec<String> {
        let mut args = self.detector_command.clone();
        args.extend(self.detector.to_args());
        args
    }
}

fn parse_var<T, F>(var: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(name, raw)),
    }
}

fn parse_flag<F>(var: &F, name: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::invalid(name, raw)),
        },
    }
}
