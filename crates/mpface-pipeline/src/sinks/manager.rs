//! Sink set owned by a pipeline run.

use mpface_media::VideoProperties;
use mpface_models::SinkConfig;
use tracing::{debug, warn};

use super::{
    ArtifactSummary, FrameArtifacts, FrameSink, ImageSink, ManagedSink, StructuredSink,
    TabularSink, VideoSink,
};
use crate::error::PipelineResult;

/// Owns every enabled sink and routes per-frame artifacts to them.
pub struct SinkManager {
    sinks: Vec<ManagedSink>,
}

impl SinkManager {
    /// Wrap already constructed sinks, in write order.
    pub fn new(sinks: Vec<Box<dyn FrameSink>>) -> Self {
        Self {
            sinks: sinks.into_iter().map(ManagedSink::new).collect(),
        }
    }

    /// Build the sinks enabled in `config`. Nothing is opened yet.
    pub fn from_config(config: &SinkConfig, properties: VideoProperties, video_codec: &str) -> Self {
        let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
        if let Some(path) = &config.csv {
            sinks.push(Box::new(TabularSink::new(path)));
        }
        if let Some(pattern) = &config.json_pattern {
            sinks.push(Box::new(StructuredSink::new(pattern.clone())));
        }
        if let Some(pattern) = &config.frame_pattern {
            sinks.push(Box::new(ImageSink::new(pattern.clone())));
        }
        if let Some(path) = &config.video {
            sinks.push(Box::new(VideoSink::ffmpeg(path, properties, video_codec)));
        }
        Self::new(sinks)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Whether any sink consumes annotated frames.
    pub fn renders_frames(&self) -> bool {
        self.sinks.iter().any(ManagedSink::renders_frames)
    }

    /// Open every sink. If one fails, the ones already opened are closed
    /// before the error is returned.
    pub async fn open_all(&mut self) -> PipelineResult<()> {
        for i in 0..self.sinks.len() {
            let opened = self.sinks[i].open().await;
            if let Err(e) = opened {
                if let Err(close_err) = self.close_all().await {
                    warn!(error = %close_err, "Failed to close sinks after open failure");
                }
                return Err(e);
            }
            debug!(kind = %self.sinks[i].kind(), "Sink opened");
        }
        Ok(())
    }

    /// Offer one frame's artifacts to every sink, in order.
    pub async fn offer(&mut self, artifacts: &FrameArtifacts<'_>) -> PipelineResult<()> {
        for sink in &mut self.sinks {
            sink.write(artifacts).await?;
        }
        Ok(())
    }

    /// Close every sink, even after one fails. Returns the first failure.
    pub async fn close_all(&mut self) -> PipelineResult<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.close().await {
                warn!(kind = %sink.kind(), error = %e, "Failed to close sink");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// What each sink produced so far.
    pub fn artifacts(&self) -> Vec<ArtifactSummary> {
        self.sinks.iter().map(ManagedSink::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, SinkKind};
    use crate::sinks::SinkState;
    use mpface_models::FilenamePattern;
    use std::path::PathBuf;

    #[test]
    fn test_from_config_order() {
        let config = SinkConfig {
            csv: Some(PathBuf::from("scores.csv")),
            json_pattern: Some(FilenamePattern::parse("json/{0}.json").unwrap()),
            video: Some(PathBuf::from("annotated.mp4")),
            frame_pattern: None,
        };
        let manager = SinkManager::from_config(&config, VideoProperties::new(4, 4, 30.0), "mpeg4");

        assert_eq!(manager.len(), 3);
        assert!(manager.renders_frames());
        let kinds: Vec<&str> = manager.artifacts().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec!["tabular", "structured", "video"]);
    }

    #[test]
    fn test_empty_config() {
        let manager =
            SinkManager::from_config(&SinkConfig::default(), VideoProperties::new(4, 4, 30.0), "mpeg4");
        assert!(manager.is_empty());
        assert!(!manager.renders_frames());
    }

    #[tokio::test]
    async fn test_open_failure_closes_opened_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("scores.csv");
        let bad_images = FilenamePattern::parse("frames/{0}.unknown").unwrap();

        let mut manager = SinkManager::new(vec![
            Box::new(TabularSink::new(&csv)),
            Box::new(ImageSink::new(bad_images)),
        ]);

        let err = manager.open_all().await.unwrap_err();
        assert!(matches!(err, PipelineError::Sink { kind: SinkKind::Image, .. }));
        assert!(manager.sinks.iter().all(|s| s.state() == SinkState::Closed));

        // The score file was flushed with its header on close
        let content = std::fs::read_to_string(&csv).unwrap();
        assert!(content.starts_with("frame,offset,"));
    }
}
