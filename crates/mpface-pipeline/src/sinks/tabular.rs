//! Blendshape score file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mpface_models::{BlendshapeRow, CSV_LINE_TERMINATOR};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::{ensure_parent, FrameArtifacts, FrameSink};
use crate::error::{PipelineError, PipelineResult, SinkKind};

/// Writes the header at open and one row per frame with a detected face.
pub struct TabularSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TabularSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    async fn write_line(&mut self, line: &str) -> PipelineResult<()> {
        let writer = self.writer.as_mut().ok_or(PipelineError::SinkState {
            kind: SinkKind::Tabular,
            state: "unopened",
        })?;
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(CSV_LINE_TERMINATOR.as_bytes()).await
        }
        .await;
        result.map_err(|e| PipelineError::sink(SinkKind::Tabular, &self.path, e))
    }
}

#[async_trait]
impl FrameSink for TabularSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Tabular
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn open(&mut self) -> PipelineResult<()> {
        ensure_parent(SinkKind::Tabular, &self.path).await?;
        let file = File::create(&self.path)
            .await
            .map_err(|e| PipelineError::sink(SinkKind::Tabular, &self.path, e))?;
        self.writer = Some(BufWriter::new(file));
        self.write_line(&BlendshapeRow::header()).await?;
        debug!(path = %self.path.display(), "Opened score file");
        Ok(())
    }

    async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool> {
        let Some(row) = artifacts.row else {
            return Ok(false);
        };
        self.write_line(&row.to_line()).await?;
        Ok(true)
    }

    async fn close(&mut self) -> PipelineResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let result = async {
                writer.flush().await?;
                writer.shutdown().await
            }
            .await;
            result.map_err(|e| PipelineError::sink(SinkKind::Tabular, &self.path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[tokio::test]
    async fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scores.csv");
        let mut sink = TabularSink::new(&path);
        let image = RgbImage::new(1, 1);

        sink.open().await.unwrap();

        let mut row = BlendshapeRow::new(2, 2.0 / 30.0);
        row.set("jawOpen", 0.5);
        let with_row = FrameArtifacts {
            frame: 2,
            row: Some(&row),
            record: None,
            annotated: None,
            video_frame: &image,
        };
        let without_row = FrameArtifacts {
            frame: 3,
            row: None,
            ..with_row
        };

        assert!(sink.write(&with_row).await.unwrap());
        assert!(!sink.write(&without_row).await.unwrap());
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("frame,offset,_neutral"));
        assert!(lines[1].starts_with("2,0.06666666666666667,"));
        assert!(content.ends_with("\r\n"));
    }
}
