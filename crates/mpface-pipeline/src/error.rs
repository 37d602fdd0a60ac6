//! Pipeline error types.

use std::fmt;
use std::path::PathBuf;

use mpface_media::MediaError;
use mpface_models::ConfigError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Boxed cause of a sink I/O failure.
pub type SinkCause = Box<dyn std::error::Error + Send + Sync>;

/// Output sink category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Tabular,
    Structured,
    Image,
    Video,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Tabular => "tabular",
            SinkKind::Structured => "structured",
            SinkKind::Image => "image",
            SinkKind::Video => "video",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a face landmarker.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector command is empty")]
    EmptyCommand,

    #[error("Failed to start detector `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Detector I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Detector exited unexpectedly")]
    Exited,

    #[error("Detector protocol violation: {0}")]
    Protocol(String),

    #[error("Detector reported an error: {0}")]
    Reported(String),

    #[error("Timestamp {timestamp_ms} ms precedes previous timestamp {previous_ms} ms")]
    TimestampRegression { timestamp_ms: u64, previous_ms: u64 },
}

impl DetectorError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Fatal pipeline errors. Every variant raised after startup is returned
/// only once all opened sinks were closed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[source] MediaError),

    #[error("Detector failed on frame {frame}: {source}")]
    Detector {
        frame: u64,
        #[source]
        source: DetectorError,
    },

    #[error("Detector unavailable: {0}")]
    DetectorStartup(#[source] DetectorError),

    #[error("{kind} sink failed at {}: {source}", location.display())]
    Sink {
        kind: SinkKind,
        location: PathBuf,
        #[source]
        source: SinkCause,
    },

    #[error("{kind} sink used while {state}")]
    SinkState { kind: SinkKind, state: &'static str },

    #[error("Cancelled after {frames_processed} frames")]
    Cancelled { frames_processed: u64 },
}

impl PipelineError {
    pub fn input(err: MediaError) -> Self {
        Self::Input(err)
    }

    pub fn sink(kind: SinkKind, location: impl Into<PathBuf>, source: impl Into<SinkCause>) -> Self {
        Self::Sink {
            kind,
            location: location.into(),
            source: source.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Input(_) => 3,
            PipelineError::Detector { .. } | PipelineError::DetectorStartup(_) => 4,
            PipelineError::Sink { .. } => 5,
            PipelineError::Cancelled { .. } => 130,
            PipelineError::SinkState { .. } => 1,
        }
    }

    /// Whether this is a cooperative cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}
