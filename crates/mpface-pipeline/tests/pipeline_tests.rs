//! End-to-end pipeline runs against an in-memory source, a scripted
//! landmarker and a recording video encoder.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use tokio::sync::watch;

use mpface_media::{FrameRecord, FrameSource, MediaError, MediaResult, VideoEncoder, VideoProperties};
use mpface_models::{
    Category, DetectionResult, FaceResult, FilenamePattern, Landmark, OverlayStyle,
    StructuredRecord,
};
use mpface_pipeline::sinks::{ImageSink, StructuredSink, TabularSink, VideoSink};
use mpface_pipeline::{
    DetectorError, FaceLandmarker, FrameSink, PipelineConfig, PipelineDriver, PipelineError,
    SinkManager,
};

const WIDTH: u32 = 32;
const HEIGHT: u32 = 24;
const FPS: f64 = 30.0;

const POSE: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.96, -0.28, 0.0, //
    0.0, 0.28, 0.96, -45.0, //
    0.0, 0.0, 0.0, 1.0,
];

struct MemorySource {
    properties: VideoProperties,
    total: u64,
    truncate_at: Option<u64>,
    next: u64,
}

impl MemorySource {
    fn new(total: u64) -> Self {
        let mut properties = VideoProperties::new(WIDTH, HEIGHT, FPS);
        properties.frame_count = Some(total);
        Self {
            properties,
            total,
            truncate_at: None,
            next: 0,
        }
    }

    fn truncated_at(mut self, index: u64) -> Self {
        self.truncate_at = Some(index);
        self
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    fn properties(&self) -> &VideoProperties {
        &self.properties
    }

    async fn next_frame(&mut self) -> MediaResult<Option<FrameRecord>> {
        if self.truncate_at == Some(self.next) {
            return Err(MediaError::TruncatedFrame {
                index: self.next,
                expected: self.properties.frame_bytes(),
                actual: 7,
            });
        }
        if self.next >= self.total {
            return Ok(None);
        }
        let index = self.next;
        self.next += 1;
        let pixels = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([index as u8 * 10, 40, 80]));
        Ok(Some(FrameRecord::new(
            index,
            self.properties.timestamp_of(index),
            pixels,
        )))
    }
}

/// Landmarker answering from a per-frame script.
struct ScriptedDetector<F> {
    script: F,
    timestamps: Vec<u64>,
}

impl<F> ScriptedDetector<F>
where
    F: FnMut(u64) -> Result<DetectionResult, DetectorError> + Send,
{
    fn new(script: F) -> Self {
        Self {
            script,
            timestamps: Vec::new(),
        }
    }
}

impl<F> FaceLandmarker for ScriptedDetector<F>
where
    F: FnMut(u64) -> Result<DetectionResult, DetectorError> + Send,
{
    fn detect(
        &mut self,
        frame: &FrameRecord,
        timestamp_ms: u64,
    ) -> Result<DetectionResult, DetectorError> {
        self.timestamps.push(timestamp_ms);
        (self.script)(frame.index)
    }
}

/// Video encoder keeping every frame in memory.
#[derive(Clone, Default)]
struct RecordingEncoder {
    frames: Arc<Mutex<Vec<RgbImage>>>,
    finished: Arc<Mutex<bool>>,
}

#[async_trait]
impl VideoEncoder for RecordingEncoder {
    async fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    async fn finish(&mut self) -> MediaResult<u64> {
        *self.finished.lock().unwrap() = true;
        Ok(self.frames.lock().unwrap().len() as u64)
    }
}

fn face(jaw_open: f32) -> FaceResult {
    let landmarks = (0..478)
        .map(|i| {
            let t = i as f32 * 0.731;
            let r = 0.05 + 0.3 * (i as f32 / 478.0);
            Landmark::new(0.5 + r * t.cos(), 0.5 + r * t.sin(), 0.0)
        })
        .collect();
    FaceResult {
        landmarks,
        blendshapes: vec![
            Category::new("_neutral", 0.01),
            Category::new("jawOpen", jaw_open),
            Category::new("mouthSmileLeft", 0.125),
        ],
        transform: Some(POSE),
    }
}

/// Faces on frames 0-4 only.
fn first_five(index: u64) -> Result<DetectionResult, DetectorError> {
    if index < 5 {
        Ok(DetectionResult::new(vec![face(0.5)]))
    } else {
        Ok(DetectionResult::empty())
    }
}

fn not_cancelled() -> watch::Receiver<bool> {
    watch::channel(false).1
}

fn csv_lines(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.ends_with("\r\n"));
    content.split_terminator("\r\n").map(str::to_string).collect()
}

#[tokio::test]
async fn test_score_file_rows_for_detected_frames_only() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");

    let mut source = MemorySource::new(10);
    let mut detector = ScriptedDetector::new(first_five);
    let mut sinks = SinkManager::new(vec![Box::new(TabularSink::new(&csv))]);

    let summary = PipelineDriver::new(OverlayStyle::default())
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap();

    assert_eq!(summary.frames, 10);
    assert_eq!(summary.frames_with_faces, 5);
    assert_eq!(summary.artifacts[0].count, 5);

    let lines = csv_lines(&csv);
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("frame,offset,_neutral,browDownLeft"));

    for (i, line) in lines[1..].iter().enumerate() {
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells.len(), 54);
        assert_eq!(cells[0], i.to_string());
        assert_eq!(cells[1].parse::<f64>().unwrap(), i as f64 / FPS);
        assert_eq!(cells[2], "0.010000");
        assert_eq!(cells[2 + 25], "0.500000");
        assert_eq!(cells[3], "");
    }
    assert!(lines[1].starts_with("0,0.0,"));
    assert!(lines[2].starts_with("1,0.03333333333333333,"));
    assert!(lines[4].starts_with("3,0.1,"));

    // Detector timestamps are whole milliseconds and never decrease
    assert_eq!(&detector.timestamps[..4], &[0, 33, 66, 100]);
    assert!(detector.timestamps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(detector.timestamps.len(), 10);
}

#[tokio::test]
async fn test_video_gets_every_frame() {
    let encoder = RecordingEncoder::default();
    let mut source = MemorySource::new(10);
    let mut detector = ScriptedDetector::new(first_five);
    let mut sinks = SinkManager::new(vec![Box::new(VideoSink::with_encoder(
        "annotated.mp4",
        Box::new(encoder.clone()),
    ))]);

    let summary = PipelineDriver::new(OverlayStyle::new(true, true, true))
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap();

    let frames = encoder.frames.lock().unwrap();
    assert_eq!(frames.len(), 10);
    assert!(frames.iter().all(|f| f.dimensions() == (WIDTH, HEIGHT)));
    assert!(*encoder.finished.lock().unwrap());
    assert_eq!(summary.artifacts[0].count, 10);

    // Detected frames carry the overlay; the rest are passed through untouched
    for (i, frame) in frames.iter().enumerate() {
        let original = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([i as u8 * 10, 40, 80]));
        if i < 5 {
            assert_ne!(*frame, original, "frame {} should be annotated", i);
        } else {
            assert_eq!(*frame, original, "frame {} should be unchanged", i);
        }
    }
}

#[tokio::test]
async fn test_two_faces() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");
    let pattern = FilenamePattern::parse(dir.path().join("dump-{0}.json").to_string_lossy()).unwrap();

    let mut source = MemorySource::new(3);
    let mut detector =
        ScriptedDetector::new(|_| Ok(DetectionResult::new(vec![face(0.2), face(0.9)])));
    let mut sinks = SinkManager::new(vec![
        Box::new(TabularSink::new(&csv)),
        Box::new(StructuredSink::new(pattern)),
    ]);

    PipelineDriver::new(OverlayStyle::default())
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap();

    let lines = csv_lines(&csv);
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().skip(1).all(|l| l.contains(",0.200000,")));
    assert!(!lines.iter().any(|l| l.contains("0.900000")));

    let dump = std::fs::read(dir.path().join("dump-2.json")).unwrap();
    let record: StructuredRecord = serde_json::from_slice(&dump).unwrap();
    assert_eq!(record.frame, 2);
    assert_eq!(record.face_count(), 2);
    assert_eq!(record.faces[1].blendshapes[1].score, 0.9);
    assert_eq!(record.faces[0].landmarks.len(), 478);
    assert_eq!(record.faces[1].transform, Some(POSE));
}

#[tokio::test]
async fn test_score_file_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let mut outputs = Vec::new();

    for run in 0..2 {
        let csv = dir.path().join(format!("scores-{}.csv", run));
        let mut source = MemorySource::new(10);
        let mut detector = ScriptedDetector::new(first_five);
        let mut sinks = SinkManager::new(vec![Box::new(TabularSink::new(&csv))]);
        PipelineDriver::new(OverlayStyle::default())
            .run(&mut source, &mut detector, &mut sinks, not_cancelled())
            .await
            .unwrap();
        outputs.push(std::fs::read(&csv).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn test_detector_failure_closes_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");
    let encoder = RecordingEncoder::default();

    let mut source = MemorySource::new(10);
    let mut detector = ScriptedDetector::new(|index| {
        if index == 3 {
            Err(DetectorError::Reported("model crashed".to_string()))
        } else {
            Ok(DetectionResult::new(vec![face(0.5)]))
        }
    });
    let mut sinks = SinkManager::new(vec![
        Box::new(TabularSink::new(&csv)),
        Box::new(VideoSink::with_encoder("out.mp4", Box::new(encoder.clone()))),
    ]);

    let err = PipelineDriver::new(OverlayStyle::default())
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Detector { frame: 3, .. }));
    assert_eq!(err.exit_code(), 4);

    // Rows for the frames before the failure reached the disk
    assert_eq!(csv_lines(&csv).len(), 4);
    assert_eq!(encoder.frames.lock().unwrap().len(), 3);
    assert!(*encoder.finished.lock().unwrap());
}

#[tokio::test]
async fn test_cancellation_stops_after_current_frame() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let mut source = MemorySource::new(10);
    let mut detector = ScriptedDetector::new(move |index| {
        if index == 2 {
            cancel_tx.send(true).unwrap();
        }
        Ok(DetectionResult::new(vec![face(0.5)]))
    });
    let mut sinks = SinkManager::new(vec![Box::new(TabularSink::new(&csv))]);

    let err = PipelineDriver::new(OverlayStyle::default())
        .run(&mut source, &mut detector, &mut sinks, cancel_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled { frames_processed: 3 }));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(csv_lines(&csv).len(), 4);
}

#[tokio::test]
async fn test_truncated_input_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");

    let mut source = MemorySource::new(10).truncated_at(4);
    let mut detector = ScriptedDetector::new(first_five);
    let mut sinks = SinkManager::new(vec![Box::new(TabularSink::new(&csv))]);

    let err = PipelineDriver::new(OverlayStyle::default())
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Input(MediaError::TruncatedFrame { index: 4, .. })
    ));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(csv_lines(&csv).len(), 5);
}

#[tokio::test]
async fn test_images_for_detected_frames() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = FilenamePattern::parse(
        dir.path()
            .join("frames")
            .join("frame-{frame}.png")
            .to_string_lossy(),
    )
    .unwrap();

    let mut source = MemorySource::new(8);
    let mut detector = ScriptedDetector::new(first_five);
    let sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(ImageSink::new(pattern))];
    let mut sinks = SinkManager::new(sinks);

    let summary = PipelineDriver::new(OverlayStyle::new(false, true, true))
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap();

    assert_eq!(summary.artifacts[0].count, 5);
    for i in 0..8 {
        let path = dir.path().join("frames").join(format!("frame-{}.png", i));
        assert_eq!(path.exists(), i < 5, "frame {}", i);
    }
}

#[tokio::test]
async fn test_no_sinks_still_counts_frames() {
    let mut source = MemorySource::new(4);
    let mut detector = ScriptedDetector::new(first_five);
    let mut sinks = SinkManager::new(Vec::new());

    let summary = PipelineDriver::new(OverlayStyle::all())
        .with_progress_interval(2)
        .run(&mut source, &mut detector, &mut sinks, not_cancelled())
        .await
        .unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.frames_with_faces, 4);
    assert!(summary.artifacts.is_empty());
}

#[test]
fn test_config_errors_create_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("scores.csv");
    let csv_value = csv.to_string_lossy().to_string();

    let vars = [
        ("MPFACE_INPUT", "in.mp4".to_string()),
        ("MPFACE_CSV", csv_value),
        ("MPFACE_JSON_PATTERN", "frame.json".to_string()),
    ];
    let result = PipelineConfig::from_lookup(|name| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.clone())
    });

    assert!(result.is_err());
    let err = PipelineError::from(result.unwrap_err());
    assert_eq!(err.exit_code(), 2);
    assert!(!csv.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
