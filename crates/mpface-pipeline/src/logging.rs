//! Tracing setup and run-scoped logging.

use std::path::Path;

use tracing::{info, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_DIRECTIVES: &str = "mpface=info,mpface_pipeline=info,mpface_media=info";

/// Initialize tracing: colored output by default, JSON with `LOG_FORMAT=json`.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

    // Logs go to stderr; stdout carries the run summary
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Progress reporting for one run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    interval: u64,
    expected_frames: Option<u64>,
}

impl RunLogger {
    /// Log every `interval` frames. `expected_frames` is the container's
    /// frame count, when known.
    pub fn new(interval: u64, expected_frames: Option<u64>) -> Self {
        Self {
            interval: interval.max(1),
            expected_frames,
        }
    }

    /// Span wrapping a whole run.
    pub fn create_span(input: &Path) -> Span {
        tracing::info_span!("run", input = %input.display())
    }

    /// Whether a progress line is due after `frames` processed frames.
    pub fn is_due(&self, frames: u64) -> bool {
        frames > 0 && frames % self.interval == 0
    }

    /// Percentage of the expected frame count, when known.
    pub fn percent(&self, frames: u64) -> Option<f64> {
        self.expected_frames
            .filter(|&total| total > 0)
            .map(|total| (frames as f64 / total as f64 * 100.0).min(100.0))
    }

    /// Log progress if a line is due.
    pub fn log_progress(&self, frames: u64, frames_with_faces: u64) {
        if !self.is_due(frames) {
            return;
        }
        match self.percent(frames) {
            Some(percent) => info!(
                frames,
                frames_with_faces,
                "Progress: {:.1}% of {} frames",
                percent,
                self.expected_frames.unwrap_or_default()
            ),
            None => info!(frames, frames_with_faces, "Progress"),
        }
    }
}
