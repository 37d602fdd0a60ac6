//! Sequential frame sources.

use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::command::{collect_stderr, FfmpegCommand, PIPE};
use crate::error::{MediaError, MediaResult};
use crate::frame::{FrameRecord, VideoProperties};
use crate::probe::probe_video;

/// Source of decoded frames in strictly increasing index order.
#[async_trait]
pub trait FrameSource: Send {
    /// Geometry and frame rate of the stream.
    fn properties(&self) -> &VideoProperties;

    /// Next frame, or `None` at the end of the stream.
    ///
    /// An error before the end of the stream is fatal for the run.
    async fn next_frame(&mut self) -> MediaResult<Option<FrameRecord>>;
}

/// Decodes a video file to RGB24 frames through an FFmpeg child process.
pub struct FfmpegFrameSource {
    path: PathBuf,
    properties: VideoProperties,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    next_index: u64,
}

impl FfmpegFrameSource {
    /// Probe and open a video for decoding.
    pub async fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let info = probe_video(path).await?;
        let properties = VideoProperties::from(&info);

        let cmd = FfmpegCommand::new(path.to_string_lossy(), PIPE)
            .raw_rgb_output()
            .passthrough_timing();
        let mut child = cmd.to_command()?.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stdout not captured"))?;
        let stderr_task = child.stderr.take().map(collect_stderr);

        info!(
            path = %path.display(),
            width = properties.width,
            height = properties.height,
            fps = properties.fps,
            frames = ?properties.frame_count,
            codec = %info.codec,
            "Opened video source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            properties,
            child,
            stdout: Some(stdout),
            stderr_task,
            next_index: 0,
        })
    }

    /// Path of the decoded video.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the decoder after its output ended and check how it exited.
    async fn finish(&mut self) -> MediaResult<()> {
        self.stdout = None;
        let status = self.child.wait().await?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if status.success() {
            debug!(frames = self.next_index, "Video source exhausted");
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                format!(
                    "Decoding {} failed after {} frames",
                    self.path.display(),
                    self.next_index
                ),
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    async fn next_frame(&mut self) -> MediaResult<Option<FrameRecord>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let expected = self.properties.frame_bytes();
        let mut buffer = vec![0u8; expected];
        let filled = read_full(stdout, &mut buffer).await?;

        if filled == 0 {
            self.finish().await?;
            return Ok(None);
        }
        if filled < expected {
            return Err(MediaError::TruncatedFrame {
                index: self.next_index,
                expected,
                actual: filled,
            });
        }

        let pixels = RgbImage::from_raw(self.properties.width, self.properties.height, buffer)
            .ok_or_else(|| MediaError::internal("Frame buffer does not match frame geometry"))?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(FrameRecord::new(
            index,
            self.properties.timestamp_of(index),
            pixels,
        )))
    }
}

/// Fill `buf` from `reader`, returning how many bytes were read before EOF.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
