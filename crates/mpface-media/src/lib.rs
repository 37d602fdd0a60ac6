#![deny(unreachable_patterns)]
//! Video I/O and overlay rendering for the mpface pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Video probing through FFprobe
//! - A frame source that decodes a video to raw RGB frames over a pipe
//! - A video encoder that muxes raw RGB frames into an MP4 over a pipe
//! - Face-mesh overlay rendering (tesselation, contours, irises)

pub mod command;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod probe;
pub mod source;

pub use command::{check_ffmpeg, check_ffprobe, new_command, FfmpegCommand};
pub use encoder::{FfmpegVideoEncoder, VideoEncoder, DEFAULT_VIDEO_CODEC};
pub use error::{MediaError, MediaResult};
pub use frame::{FrameRecord, VideoProperties};
pub use overlay::{render_overlay, DrawingSpec, OverlayRenderer};
pub use probe::{probe_video, VideoInfo};
pub use source::{FfmpegFrameSource, FrameSource};
