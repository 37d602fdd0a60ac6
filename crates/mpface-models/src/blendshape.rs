//! Fixed blendshape schema and tabular rows.
//!
//! The column order is pinned: downstream analysis scripts index the score
//! file by position as well as by name, so the list below must never be
//! reordered. New categories reported by a detector are ignored rather than
//! appended.

use std::fmt::Write as _;

/// Number of blendshape categories in the schema.
pub const BLENDSHAPE_COUNT: usize = 52;

/// Blendshape category names in column order.
pub const BLENDSHAPE_CATEGORIES: [&str; BLENDSHAPE_COUNT] = [
    "_neutral",
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "eyeBlinkLeft",
    "eyeBlinkRight",
    "eyeLookDownLeft",
    "eyeLookDownRight",
    "eyeLookInLeft",
    "eyeLookInRight",
    "eyeLookOutLeft",
    "eyeLookOutRight",
    "eyeLookUpLeft",
    "eyeLookUpRight",
    "eyeSquintLeft",
    "eyeSquintRight",
    "eyeWideLeft",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawOpen",
    "jawRight",
    "mouthClose",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthFunnel",
    "mouthLeft",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthPucker",
    "mouthRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "noseSneerLeft",
    "noseSneerRight",
];

/// Field delimiter of the score file.
pub const CSV_DELIMITER: char = ',';

/// Line terminator of the score file.
pub const CSV_LINE_TERMINATOR: &str = "\r\n";

/// Column index of a category in the schema, if it is part of it.
pub fn category_index(name: &str) -> Option<usize> {
    BLENDSHAPE_CATEGORIES.iter().position(|c| *c == name)
}

/// One row of the blendshape score file.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendshapeRow {
    /// Zero-based frame index
    pub frame: u64,
    /// Frame offset in seconds (`frame / fps`)
    pub offset: f64,
    /// Scores in schema order; `None` leaves the cell empty
    pub scores: [Option<f32>; BLENDSHAPE_COUNT],
}

impl BlendshapeRow {
    /// Create a row with every score cell empty.
    pub fn new(frame: u64, offset: f64) -> Self {
        Self {
            frame,
            offset,
            scores: [None; BLENDSHAPE_COUNT],
        }
    }

    /// Set a score by category name.
    ///
    /// Returns `false` (and leaves the row untouched) when the category is
    /// not part of the schema.
    pub fn set(&mut self, category: &str, score: f32) -> bool {
        match category_index(category) {
            Some(idx) => {
                self.scores[idx] = Some(score);
                true
            }
            None => false,
        }
    }

    /// Score for a category, if present.
    pub fn get(&self, category: &str) -> Option<f32> {
        category_index(category).and_then(|idx| self.scores[idx])
    }

    /// Header line (without terminator).
    pub fn header() -> String {
        let mut line = String::from("frame");
        line.push(CSV_DELIMITER);
        line.push_str("offset");
        for name in BLENDSHAPE_CATEGORIES {
            line.push(CSV_DELIMITER);
            line.push_str(name);
        }
        line
    }

    /// Serialize the row as one delimited line (without terminator).
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(16 + BLENDSHAPE_COUNT * 9);
        let _ = write!(line, "{}", self.frame);
        line.push(CSV_DELIMITER);
        line.push_str(&format_offset(self.offset));
        for score in &self.scores {
            line.push(CSV_DELIMITER);
            if let Some(score) = score {
                line.push_str(&format_score(*score));
            }
        }
        line
    }
}

/// Format a score as fixed-point with six decimals.
///
/// Never produces scientific notation, which keeps score files diff-friendly.
pub fn format_score(score: f32) -> String {
    format!("{:.6}", score)
}

/// Format a frame offset in seconds.
///
/// Uses the shortest decimal that round-trips, always with a fractional
/// part: `0.0`, `0.03333333333333333`, `0.1`.
pub fn format_offset(seconds: f64) -> String {
    let mut text = seconds.to_string();
    if seconds.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_pinned() {
        assert_eq!(BLENDSHAPE_CATEGORIES.len(), 52);
        assert_eq!(BLENDSHAPE_CATEGORIES[0], "_neutral");
        assert_eq!(BLENDSHAPE_CATEGORIES[25], "jawOpen");
        assert_eq!(BLENDSHAPE_CATEGORIES[51], "noseSneerRight");

        let mut sorted = BLENDSHAPE_CATEGORIES.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 52, "category names must be unique");
    }

    #[test]
    fn test_header() {
        let header = BlendshapeRow::header();
        assert!(header.starts_with("frame,offset,_neutral,browDownLeft,"));
        assert!(header.ends_with(",noseSneerLeft,noseSneerRight"));
        assert_eq!(header.split(',').count(), 54);
    }

    #[test]
    fn test_row_line_leaves_missing_cells_empty() {
        let mut row = BlendshapeRow::new(3, 0.1);
        assert!(row.set("jawOpen", 0.5));
        assert!(!row.set("tongueOut", 0.9));

        let line = row.to_line();
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells.len(), 54);
        assert_eq!(cells[0], "3");
        assert_eq!(cells[1], "0.1");
        assert_eq!(cells[2 + 25], "0.500000");
        assert_eq!(cells[2], "");
    }

    #[test]
    fn test_format_score_fixed_point() {
        assert_eq!(format_score(0.0000012), "0.000001");
        assert_eq!(format_score(1.0), "1.000000");
        assert_eq!(format_score(0.25), "0.250000");
        assert!(!format_score(1e-9).contains('e'));
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0.0), "0.0");
        assert_eq!(format_offset(1.0 / 30.0), "0.03333333333333333");
        assert_eq!(format_offset(3.0 / 30.0), "0.1");
        assert_eq!(format_offset(2.0), "2.0");
    }
}
