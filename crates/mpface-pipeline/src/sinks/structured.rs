//! Per-frame JSON dumps.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mpface_models::FilenamePattern;

use super::{ensure_parent, FrameArtifacts, FrameSink};
use crate::error::{PipelineError, PipelineResult, SinkKind};

/// Writes one JSON file per frame with a detected face.
pub struct StructuredSink {
    pattern: FilenamePattern,
    location: PathBuf,
}

impl StructuredSink {
    pub fn new(pattern: FilenamePattern) -> Self {
        Self {
            location: PathBuf::from(pattern.as_str()),
            pattern,
        }
    }
}

#[async_trait]
impl FrameSink for StructuredSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Structured
    }

    fn location(&self) -> &Path {
        &self.location
    }

    async fn open(&mut self) -> PipelineResult<()> {
        ensure_parent(SinkKind::Structured, &self.pattern.render(0)).await
    }

    async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool> {
        let Some(record) = artifacts.record else {
            return Ok(false);
        };

        let path = self.pattern.render(artifacts.frame);
        // Placeholders may sit in a directory component
        ensure_parent(SinkKind::Structured, &path).await?;

        let body = serde_json::to_vec(record)
            .map_err(|e| PipelineError::sink(SinkKind::Structured, &path, e))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| PipelineError::sink(SinkKind::Structured, &path, e))?;
        Ok(true)
    }

    async fn close(&mut self) -> PipelineResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use mpface_models::{Category, FaceRecord, Landmark, StructuredRecord};

    #[tokio::test]
    async fn test_one_file_per_detected_frame() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("dump").join("frame-{0}.json");
        let pattern = FilenamePattern::parse(pattern.to_string_lossy()).unwrap();
        let mut sink = StructuredSink::new(pattern);
        let image = RgbImage::new(1, 1);

        let record = StructuredRecord {
            frame: 7,
            offset: 7.0 / 30.0,
            faces: vec![FaceRecord {
                landmarks: vec![Landmark::new(0.25, 0.5, 0.0)],
                blendshapes: vec![Category::new("jawOpen", 0.75)],
                transform: None,
            }],
        };

        sink.open().await.unwrap();
        let artifacts = FrameArtifacts {
            frame: 7,
            row: None,
            record: Some(&record),
            annotated: None,
            video_frame: &image,
        };
        assert!(sink.write(&artifacts).await.unwrap());
        assert!(!sink
            .write(&FrameArtifacts {
                frame: 8,
                record: None,
                ..artifacts
            })
            .await
            .unwrap());
        sink.close().await.unwrap();

        let written = dir.path().join("dump").join("frame-7.json");
        let parsed: StructuredRecord =
            serde_json::from_slice(&std::fs::read(&written).unwrap()).unwrap();
        assert_eq!(parsed, record);
        assert!(!dir.path().join("dump").join("frame-8.json").exists());
    }
}
