//! Annotated video encoding.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::{collect_stderr, FfmpegCommand, PIPE};
use crate::error::{MediaError, MediaResult};
use crate::frame::VideoProperties;

/// MPEG-4 Part 2 (FourCC `mp4v`).
pub const DEFAULT_VIDEO_CODEC: &str = "mpeg4";

/// Appends frames to an output video whose geometry is fixed at creation.
#[async_trait]
pub trait VideoEncoder: Send {
    /// Append one frame.
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;

    /// Flush and finalize the container. Returns the number of frames written.
    async fn finish(&mut self) -> MediaResult<u64>;
}

/// Encodes RGB24 frames into an MP4 file through an FFmpeg child process.
pub struct FfmpegVideoEncoder {
    path: PathBuf,
    properties: VideoProperties,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    frames_written: u64,
}

impl FfmpegVideoEncoder {
    /// Start an encoder for frames of the given geometry and rate.
    pub fn spawn(
        path: impl AsRef<Path>,
        properties: &VideoProperties,
        codec: &str,
    ) -> MediaResult<Self> {
        let path = path.as_ref();
        let cmd = FfmpegCommand::new(PIPE, path.to_string_lossy())
            .raw_rgb_input(properties.width, properties.height, properties.fps)
            .no_audio()
            .video_codec(codec)
            .pixel_format("yuv420p");

        let mut child = cmd.to_command()?.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stdin not captured"))?;
        let stderr_task = child.stderr.take().map(collect_stderr);

        info!(
            path = %path.display(),
            width = properties.width,
            height = properties.height,
            fps = properties.fps,
            codec,
            "Started video encoder"
        );

        Ok(Self {
            path: path.to_path_buf(),
            properties: *properties,
            child,
            stdin: Some(stdin),
            stderr_task,
            frames_written: 0,
        })
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reap the child and turn a failed exit into an error with FFmpeg's stderr.
    async fn wait_for_exit(&mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!("Encoding {} failed", self.path.display()),
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

#[async_trait]
impl VideoEncoder for FfmpegVideoEncoder {
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.width() != self.properties.width || frame.height() != self.properties.height {
            return Err(MediaError::FrameSizeMismatch {
                expected_width: self.properties.width,
                expected_height: self.properties.height,
                width: frame.width(),
                height: frame.height(),
            });
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("Encoder already finished"))?;

        if let Err(e) = stdin.write_all(frame.as_raw()).await {
            // A broken pipe means FFmpeg exited; its stderr says why
            warn!(error = %e, "Video encoder pipe closed");
            self.stdin = None;
            self.wait_for_exit().await?;
            return Err(MediaError::Io(e));
        }

        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> MediaResult<u64> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await?;
            // Dropping stdin sends EOF so FFmpeg writes the trailer
            drop(stdin);
            self.wait_for_exit().await?;
            debug!(
                path = %self.path.display(),
                frames = self.frames_written,
                "Video encoder finished"
            );
        }
        Ok(self.frames_written)
    }
}
