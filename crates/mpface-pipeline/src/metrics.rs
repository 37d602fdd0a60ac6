//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the binary installs no exporter,
//! so an embedding application decides where they go.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_TOTAL: &str = "mpface_frames_total";
    pub const FRAMES_WITH_FACES_TOTAL: &str = "mpface_frames_with_faces_total";
    pub const DETECTOR_LATENCY_SECONDS: &str = "mpface_detector_latency_seconds";
}

/// Record one processed frame.
pub fn record_frame(faces: usize) {
    counter!(names::FRAMES_TOTAL).increment(1);
    if faces > 0 {
        counter!(names::FRAMES_WITH_FACES_TOTAL).increment(1);
    }
}

/// Record one detector call.
pub fn record_detector_latency(duration_secs: f64) {
    histogram!(names::DETECTOR_LATENCY_SECONDS).record(duration_secs);
}
