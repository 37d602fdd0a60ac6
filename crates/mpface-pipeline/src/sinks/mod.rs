//! Output sinks.
//!
//! Every sink follows the same lifecycle, enforced by [`ManagedSink`]:
//! `Unopened -> Open -> Closed`. Sinks are opened once before the first frame
//! and closed once after the last one, on every exit path.

mod frames;
mod manager;
mod structured;
mod tabular;
mod video;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;
use mpface_models::{BlendshapeRow, StructuredRecord};
use serde::Serialize;
use tracing::warn;

use crate::error::{PipelineError, PipelineResult, SinkKind};

pub use frames::{frame_format, ImageSink};
pub use manager::SinkManager;
pub use structured::StructuredSink;
pub use tabular::TabularSink;
pub use video::VideoSink;

/// Everything produced for one frame, offered to every sink.
#[derive(Debug, Clone, Copy)]
pub struct FrameArtifacts<'a> {
    pub frame: u64,
    /// Score row, present when at least one face was detected
    pub row: Option<&'a BlendshapeRow>,
    /// Structured record, present when at least one face was detected
    pub record: Option<&'a StructuredRecord>,
    /// Annotated frame, present when a face was detected and a rendering sink is enabled
    pub annotated: Option<&'a RgbImage>,
    /// Frame for the video: the annotated frame if rendered, else the original
    pub video_frame: &'a RgbImage,
}

/// One output destination.
#[async_trait]
pub trait FrameSink: Send {
    fn kind(&self) -> SinkKind;

    /// Output path or filename pattern.
    fn location(&self) -> &Path;

    /// Whether this sink consumes annotated frames.
    fn renders_frames(&self) -> bool {
        matches!(self.kind(), SinkKind::Image | SinkKind::Video)
    }

    async fn open(&mut self) -> PipelineResult<()>;

    /// Write this frame's artifact, if the sink has one for it.
    /// Returns whether anything was written.
    async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool>;

    async fn close(&mut self) -> PipelineResult<()>;
}

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Unopened,
    Open,
    Closed,
}

impl SinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkState::Unopened => "unopened",
            SinkState::Open => "open",
            SinkState::Closed => "closed",
        }
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one sink produced during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub kind: &'static str,
    pub location: PathBuf,
    /// Rows, files or video frames written
    pub count: u64,
}

/// A sink together with its lifecycle state.
pub struct ManagedSink {
    sink: Box<dyn FrameSink>,
    state: SinkState,
    written: u64,
}

impl ManagedSink {
    pub fn new(sink: Box<dyn FrameSink>) -> Self {
        Self {
            sink,
            state: SinkState::Unopened,
            written: 0,
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn kind(&self) -> SinkKind {
        self.sink.kind()
    }

    pub fn renders_frames(&self) -> bool {
        self.sink.renders_frames()
    }

    pub async fn open(&mut self) -> PipelineResult<()> {
        if self.state != SinkState::Unopened {
            return Err(self.state_error());
        }
        self.sink.open().await?;
        self.state = SinkState::Open;
        Ok(())
    }

    pub async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<()> {
        if self.state != SinkState::Open {
            return Err(self.state_error());
        }
        if self.sink.write(artifacts).await? {
            self.written += 1;
        }
        Ok(())
    }

    /// Close the sink. Closing a sink that was never opened, or twice, is a no-op.
    pub async fn close(&mut self) -> PipelineResult<()> {
        let was_open = self.state == SinkState::Open;
        self.state = SinkState::Closed;
        if was_open {
            self.sink.close().await?;
        }
        Ok(())
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            kind: self.sink.kind().as_str(),
            location: self.sink.location().to_path_buf(),
            count: self.written,
        }
    }

    fn state_error(&self) -> PipelineError {
        PipelineError::SinkState {
            kind: self.sink.kind(),
            state: self.state.as_str(),
        }
    }
}

impl Drop for ManagedSink {
    fn drop(&mut self) {
        if self.state == SinkState::Open {
            warn!(
                kind = %self.sink.kind(),
                location = %self.sink.location().display(),
                "Sink dropped without being closed"
            );
        }
    }
}

/// Create the parent directory of an output path.
pub(crate) async fn ensure_parent(kind: SinkKind, path: &Path) -> PipelineResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::sink(kind, parent, e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records lifecycle calls.
    struct ProbeSink {
        calls: Arc<Mutex<Vec<&'static str>>>,
        location: PathBuf,
    }

    #[async_trait]
    impl FrameSink for ProbeSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Structured
        }

        fn location(&self) -> &Path {
            &self.location
        }

        async fn open(&mut self) -> PipelineResult<()> {
            self.calls.lock().unwrap().push("open");
            Ok(())
        }

        async fn write(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<bool> {
            self.calls.lock().unwrap().push("write");
            Ok(artifacts.record.is_some())
        }

        async fn close(&mut self) -> PipelineResult<()> {
            self.calls.lock().unwrap().push("close");
            Ok(())
        }
    }

    fn recording_sink() -> (ManagedSink, Arc<Mutex<Vec<&'static str>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = ProbeSink {
            calls: calls.clone(),
            location: PathBuf::from("recorded-{0}.json"),
        };
        (ManagedSink::new(Box::new(sink)), calls)
    }

    #[tokio::test]
    async fn test_write_before_open_is_state_error() {
        let (mut sink, calls) = recording_sink();
        let image = RgbImage::new(1, 1);
        let artifacts = FrameArtifacts {
            frame: 0,
            row: None,
            record: None,
            annotated: None,
            video_frame: &image,
        };

        let err = sink.write(&artifacts).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SinkState {
                kind: SinkKind::Structured,
                state: "unopened"
            }
        ));
        assert!(calls.lock().unwrap().is_empty());
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (mut sink, calls) = recording_sink();
        let image = RgbImage::new(1, 1);
        let record = StructuredRecord {
            frame: 0,
            offset: 0.0,
            faces: Vec::new(),
        };

        sink.open().await.unwrap();
        assert!(sink.open().await.is_err());

        let with_record = FrameArtifacts {
            frame: 0,
            row: None,
            record: Some(&record),
            annotated: None,
            video_frame: &image,
        };
        let without = FrameArtifacts {
            record: None,
            frame: 1,
            ..with_record
        };
        sink.write(&with_record).await.unwrap();
        sink.write(&without).await.unwrap();

        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.state(), SinkState::Closed);
        assert!(sink.write(&with_record).await.is_err());

        assert_eq!(*calls.lock().unwrap(), vec!["open", "write", "write", "close"]);
        assert_eq!(sink.summary().count, 1);
        assert_eq!(sink.summary().kind, "structured");
    }
}
