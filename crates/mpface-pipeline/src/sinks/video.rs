//! Annotated video output.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mpface_media::{FfmpegVideoEncoder, VideoEncoder, VideoProperties};
use tracing::info;

use super::{ensure_parent, FrameArtifacts, FrameSink};
use crate::error::{PipelineError, PipelineResult, SinkKind};

enum Encoder {
    /// FFmpeg encoder started at open
    Pending {
        properties: VideoProperties,
        codec: String,
    },
    Ready(Box<dyn VideoEncoder>),
    Finished,
}

/// Appends every input frame to an MP4, annotated where a face was found.
pub struct VideoSink {
    path: PathBuf,
    encoder: Encoder,
}

impl VideoSink {
    /// Video sink encoding through FFmpeg with the stream's geometry and rate.
    pub fn ffmpeg(path: impl Into<PathBuf>, properties: VideoProperties, codec: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encoder: Encoder::Pending {
                properties,
                codec: codec.into(),
            },
        }
    }

    /// Video sink writing to an already constructed encoder.
    pub fn with_encoder(path: impl Into<PathBuf>, encoder: Box<dyn VideoEncoder>) -> Self {
        Self {
            path: path.into(),
            encoder: Encoder::Ready(encoder),
        }
    }
}

#[async_trait]
impl FrameSink for VideoSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Video
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn open(&mut self) -> PipelineResult<()> {
        ensure_parent(SinkKind::Video, &self.path).await?;
        if let Encoder::Pending { properties, codec } = &self.encoder {
            let encoder = FfmpegVideoEncoder::spawn(&self.path, properties, codec)
                .map_err(|e| PipelineError::sink(SinkKind::Video, &self.path, e))?;
            self.encoder = Encoder::Ready(Box::new(encoder));
        }
        Ok(())
    }

    async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool> {
        let Encoder::Ready(encoder) = &mut self.encoder else {
            return Err(PipelineError::SinkState {
                kind: SinkKind::Video,
                state: "unopened",
            });
        };
        encoder
            .write_frame(artifacts.video_frame)
            .await
            .map_err(|e| PipelineError::sink(SinkKind::Video, &self.path, e))?;
        Ok(true)
    }

    async fn close(&mut self) -> PipelineResult<()> {
        if let Encoder::Ready(mut encoder) = std::mem::replace(&mut self.encoder, Encoder::Finished) {
            let frames = encoder
                .finish()
                .await
                .map_err(|e| PipelineError::sink(SinkKind::Video, &self.path, e))?;
            info!(path = %self.path.display(), frames, "Annotated video written");
        }
        Ok(())
    }
}
