//! Per-frame structured records.
//!
//! Unlike [`BlendshapeRow`](crate::BlendshapeRow), a record is a lossless dump
//! of every detected face: all landmarks, every reported category and the
//! head-pose transform.

use serde::{Deserialize, Serialize};

use crate::detection::{category_map, Category, Landmark};

/// One face inside a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub landmarks: Vec<Landmark>,
    #[serde(with = "category_map")]
    pub blendshapes: Vec<Category>,
    /// Flattened 4x4 row-major head-pose transform, `null` when the
    /// detector reported none
    #[serde(default)]
    pub transform: Option<[f32; 16]>,
}

/// Structured dump of one frame's detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub frame: u64,
    pub offset: f64,
    pub faces: Vec<FaceRecord>,
}

impl StructuredRecord {
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}
