//! Decoded frames and stream geometry.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::probe::VideoInfo;

/// Geometry and timing of a video stream, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    /// Frames per second, used to turn frame indices into timestamps
    pub fps: f64,
    /// Frame count reported by the container, if known
    pub frame_count: Option<u64>,
}

impl VideoProperties {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            frame_count: None,
        }
    }

    /// Size of one RGB24 frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Timestamp in seconds of a frame index.
    pub fn timestamp_of(&self, index: u64) -> f64 {
        index as f64 / self.fps
    }

    /// Timestamp of a frame index in whole milliseconds, as expected by
    /// video-mode detectors.
    pub fn timestamp_ms_of(&self, index: u64) -> u64 {
        (self.timestamp_of(index) * 1000.0) as u64
    }
}

impl From<&VideoInfo> for VideoProperties {
    fn from(info: &VideoInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            fps: info.fps,
            frame_count: info.frame_count,
        }
    }
}

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Zero-based, dense frame index
    pub index: u64,
    /// `index / fps`
    pub timestamp_seconds: f64,
    /// RGB pixels
    pub pixels: RgbImage,
}

impl FrameRecord {
    pub fn new(index: u64, timestamp_seconds: f64, pixels: RgbImage) -> Self {
        Self {
            index,
            timestamp_seconds,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}
