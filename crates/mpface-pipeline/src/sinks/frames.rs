//! Per-frame annotated images.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use mpface_models::FilenamePattern;

use super::{ensure_parent, FrameArtifacts, FrameSink};
use crate::error::{PipelineError, PipelineResult, SinkKind};

/// Writes one annotated image per frame with a detected face.
///
/// The image format follows the pattern's file extension.
pub struct ImageSink {
    pattern: FilenamePattern,
    location: PathBuf,
    format: Option<ImageFormat>,
}

/// Image format for a frame path, limited to the formats frames are encoded as.
pub fn frame_format(path: impl AsRef<Path>) -> Option<ImageFormat> {
    match ImageFormat::from_path(path).ok()? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp) => Some(format),
        _ => None,
    }
}

impl ImageSink {
    pub fn new(pattern: FilenamePattern) -> Self {
        Self {
            location: PathBuf::from(pattern.as_str()),
            pattern,
            format: None,
        }
    }
}

#[async_trait]
impl FrameSink for ImageSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Image
    }

    fn location(&self) -> &Path {
        &self.location
    }

    async fn open(&mut self) -> PipelineResult<()> {
        let first = self.pattern.render(0);
        let format = frame_format(&first).ok_or_else(|| {
            PipelineError::sink(
                SinkKind::Image,
                &self.location,
                format!("unsupported image format for {}", first.display()),
            )
        })?;
        ensure_parent(SinkKind::Image, &first).await?;
        self.format = Some(format);
        Ok(())
    }

    async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool> {
        let Some(annotated) = artifacts.annotated else {
            return Ok(false);
        };
        let format = self.format.ok_or(PipelineError::SinkState {
            kind: SinkKind::Image,
            state: "unopened",
        })?;

        let path = self.pattern.render(artifacts.frame);
        ensure_parent(SinkKind::Image, &path).await?;

        let mut encoded = Cursor::new(Vec::new());
        annotated
            .write_to(&mut encoded, format)
            .map_err(|e| PipelineError::sink(SinkKind::Image, &path, e))?;
        tokio::fs::write(&path, encoded.into_inner())
            .await
            .map_err(|e| PipelineError::sink(SinkKind::Image, &path, e))?;
        Ok(true)
    }

    async fn close(&mut self) -> PipelineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn test_writes_annotated_frames_only() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("frames").join("{frame}.png");
        let pattern = FilenamePattern::parse(pattern.to_string_lossy()).unwrap();
        let mut sink = ImageSink::new(pattern);

        let original = RgbImage::new(4, 3);
        let annotated = RgbImage::from_pixel(4, 3, Rgb([255, 0, 0]));

        sink.open().await.unwrap();
        let artifacts = FrameArtifacts {
            frame: 5,
            row: None,
            record: None,
            annotated: Some(&annotated),
            video_frame: &annotated,
        };
        assert!(sink.write(&artifacts).await.unwrap());
        let skipped = FrameArtifacts {
            frame: 6,
            annotated: None,
            video_frame: &original,
            ..artifacts
        };
        assert!(!sink.write(&skipped).await.unwrap());
        sink.close().await.unwrap();

        let decoded = image::open(dir.path().join("frames").join("5.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded, annotated);
        assert!(!dir.path().join("frames").join("6.png").exists());
    }

    #[tokio::test]
    async fn test_unknown_extension_fails_at_open() {
        let pattern = FilenamePattern::parse("frames/{0}.nope").unwrap();
        let mut sink = ImageSink::new(pattern);
        let err = sink.open().await.unwrap_err();
        assert!(matches!(err, PipelineError::Sink { kind: SinkKind::Image, .. }));
    }

    #[tokio::test]
    async fn test_decode_only_format_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("frames").join("{0}.dds");
        let mut sink = ImageSink::new(FilenamePattern::parse(pattern.to_string_lossy()).unwrap());
        assert!(sink.open().await.is_err());
        assert!(!dir.path().join("frames").exists());
    }

    #[test]
    fn test_frame_formats() {
        assert_eq!(frame_format("a/1.png"), Some(ImageFormat::Png));
        assert_eq!(frame_format("a/1.JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(frame_format("a/1.bmp"), Some(ImageFormat::Bmp));
        assert_eq!(frame_format("a/1.dds"), None);
        assert_eq!(frame_format("a/1.tiff"), None);
        assert_eq!(frame_format("a/1"), None);
    }
}
