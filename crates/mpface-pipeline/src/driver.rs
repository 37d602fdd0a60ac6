//! Frame loop.

use std::time::Instant;

use mpface_media::{FrameSource, OverlayRenderer};
use mpface_models::OverlayStyle;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_PROGRESS_INTERVAL;
use crate::detector::FaceLandmarker;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::row_builder::{to_record, to_row};
use crate::sinks::{ArtifactSummary, FrameArtifacts, SinkManager};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Frames read from the source
    pub frames: u64,
    /// Frames where at least one face was detected
    pub frames_with_faces: u64,
    pub artifacts: Vec<ArtifactSummary>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    frames: u64,
    frames_with_faces: u64,
}

/// Drives frames from a source through the detector into the sinks.
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    renderer: OverlayRenderer,
    progress_interval: u64,
}

impl PipelineDriver {
    pub fn new(style: OverlayStyle) -> Self {
        Self {
            renderer: OverlayRenderer::new(style),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Run the pipeline to the end of the source.
    ///
    /// Sinks are opened before the first frame and closed on every exit path.
    /// When the run itself fails, that error is returned and close failures
    /// are only logged.
    pub async fn run(
        &self,
        source: &mut dyn FrameSource,
        detector: &mut dyn FaceLandmarker,
        sinks: &mut SinkManager,
        cancel: watch::Receiver<bool>,
    ) -> PipelineResult<RunSummary> {
        sinks.open_all().await?;

        let outcome = self.process(source, detector, sinks, &cancel).await;
        let closed = sinks.close_all().await;

        let counters = match (outcome, closed) {
            (Ok(counters), Ok(())) => counters,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "Sink close failed after run error");
                }
                if !e.is_cancelled() {
                    error!(error = %e, "Pipeline run failed");
                }
                return Err(e);
            }
        };

        let summary = RunSummary {
            frames: counters.frames,
            frames_with_faces: counters.frames_with_faces,
            artifacts: sinks.artifacts(),
        };
        info!(
            frames = summary.frames,
            frames_with_faces = summary.frames_with_faces,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    async fn process(
        &self,
        source: &mut dyn FrameSource,
        detector: &mut dyn FaceLandmarker,
        sinks: &mut SinkManager,
        cancel: &watch::Receiver<bool>,
    ) -> PipelineResult<Counters> {
        let properties = *source.properties();
        let progress = RunLogger::new(self.progress_interval, properties.frame_count);
        let renders_frames = sinks.renders_frames();
        let mut counters = Counters::default();

        loop {
            if *cancel.borrow() {
                info!(frames = counters.frames, "Cancellation requested");
                return Err(PipelineError::Cancelled {
                    frames_processed: counters.frames,
                });
            }

            let Some(frame) = source.next_frame().await.map_err(PipelineError::input)? else {
                break;
            };

            let index = counters.frames;
            let offset = properties.timestamp_of(index);
            let timestamp_ms = properties.timestamp_ms_of(index);

            let started = Instant::now();
            let result = detector
                .detect(&frame, timestamp_ms)
                .map_err(|source| PipelineError::Detector {
                    frame: index,
                    source,
                })?;
            metrics::record_detector_latency(started.elapsed().as_secs_f64());

            let row = to_row(index, offset, &result);
            let record = result.has_faces().then(|| to_record(index, offset, &result));
            let annotated = (result.has_faces() && renders_frames)
                .then(|| self.renderer.render(&frame.pixels, &result));

            let artifacts = FrameArtifacts {
                frame: index,
                row: row.as_ref(),
                record: record.as_ref(),
                annotated: annotated.as_ref(),
                video_frame: annotated.as_ref().unwrap_or(&frame.pixels),
            };
            sinks.offer(&artifacts).await?;

            counters.frames += 1;
            if result.has_faces() {
                counters.frames_with_faces += 1;
            }
            metrics::record_frame(result.faces.len());
            debug!(frame = index, faces = result.faces.len(), "Frame processed");
            progress.log_progress(counters.frames, counters.frames_with_faces);
        }

        Ok(counters)
    }
}
