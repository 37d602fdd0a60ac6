//! Frame-synchronized face signal extraction.
//!
//! Reads a video frame by frame, runs a face landmarker on every frame and
//! fans the results out to the enabled sinks:
//! - a blendshape score file (one row per frame with a face)
//! - per-frame JSON dumps of landmarks, blendshapes and head pose
//! - per-frame annotated images
//! - an annotated copy of the video (every frame)

pub mod config;
pub mod detector;
pub mod driver;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod row_builder;
pub mod sinks;

pub use config::PipelineConfig;
pub use detector::{FaceLandmarker, SidecarLandmarker};
pub use driver::{PipelineDriver, RunSummary};
pub use error::{DetectorError, PipelineError, PipelineResult, SinkKind};
pub use sinks::{FrameArtifacts, FrameSink, SinkManager};
