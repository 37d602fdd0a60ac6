//! Detector output for a single frame.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Single face landmark in normalized image coordinates.
///
/// `x` and `y` are in `[0, 1]` relative to the frame width and height for
/// points inside the frame; `z` is depth relative to the face center, on
/// roughly the same scale as `x`. Serialized as an `[x, y, z]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// One scored blendshape category.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub score: f32,
}

impl Category {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Everything the detector reports for one face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceResult {
    /// Landmarks in model order
    pub landmarks: Vec<Landmark>,
    /// Blendshape scores in the order the detector reported them
    #[serde(with = "category_map", default)]
    pub blendshapes: Vec<Category>,
    /// Head-pose transform, 4x4 row-major; `None` when the detector sent none
    #[serde(default)]
    pub transform: Option<[f32; 16]>,
}

impl FaceResult {
    /// Score of a named category, if the detector reported it.
    pub fn score(&self, name: &str) -> Option<f32> {
        self.blendshapes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.score)
    }
}

/// Detector output for one frame. An empty `faces` list means no face was found.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub faces: Vec<FaceResult>,
}

impl DetectionResult {
    /// Result with no detected face.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(faces: Vec<FaceResult>) -> Self {
        Self { faces }
    }

    /// Whether at least one face was detected.
    pub fn has_faces(&self) -> bool {
        !self.faces.is_empty()
    }

    /// The first detected face, which is the only one represented in the score file.
    pub fn primary_face(&self) -> Option<&FaceResult> {
        self.faces.first()
    }
}

/// Serialize `Vec<Category>` as a JSON object while keeping the detector's order.
pub(crate) mod category_map {
    use super::*;

    pub fn serialize<S>(categories: &[Category], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(categories.len()))?;
        for category in categories {
            map.serialize_entry(&category.name, &category.score)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Category>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = Vec<Category>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from blendshape category name to score")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut categories = Vec::with_capacity(access.size_hint().unwrap_or(52));
                while let Some((name, score)) = access.next_entry::<String, f32>()? {
                    categories.push(Category { name, score });
                }
                Ok(categories)
            }
        }

        deserializer.deserialize_map(CategoryMapVisitor)
    }
}
