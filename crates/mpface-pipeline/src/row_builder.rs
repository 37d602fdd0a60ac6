//! Maps detector output to score rows and structured records.

use mpface_models::{BlendshapeRow, DetectionResult, FaceRecord, StructuredRecord};
use tracing::trace;

/// Score-file row for a frame, built from the first detected face.
///
/// Returns `None` when no face was detected. Categories outside the fixed
/// schema are dropped and schema categories the detector did not report stay
/// empty.
pub fn to_row(frame: u64, offset: f64, result: &DetectionResult) -> Option<BlendshapeRow> {
    let face = result.primary_face()?;
    let mut row = BlendshapeRow::new(frame, offset);
    for category in &face.blendshapes {
        if !row.set(&category.name, category.score) {
            trace!(frame, category = %category.name, "Dropping unknown blendshape category");
        }
    }
    Some(row)
}

/// Lossless record of every detected face.
pub fn to_record(frame: u64, offset: f64, result: &DetectionResult) -> StructuredRecord {
    StructuredRecord {
        frame,
        offset,
        faces: result
            .faces
            .iter()
            .map(|face| FaceRecord {
                landmarks: face.landmarks.clone(),
                blendshapes: face.blendshapes.clone(),
                transform: face.transform,
            })
            .collect(),
    }
}
