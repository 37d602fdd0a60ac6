//! Overlay style flags.

use serde::{Deserialize, Serialize};

/// Which landmark overlays are painted on annotated frames.
///
/// The three passes are independent; a disabled pass is skipped entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Background triangle mesh
    pub tesselation: bool,
    /// Lips, eyes, eyebrows and face oval outlines
    pub contours: bool,
    /// Iris rings
    pub irises: bool,
}

impl OverlayStyle {
    pub fn new(tesselation: bool, contours: bool, irises: bool) -> Self {
        Self {
            tesselation,
            contours,
            irises,
        }
    }

    /// All passes enabled.
    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    /// Whether no pass is enabled.
    pub fn is_empty(&self) -> bool {
        !(self.tesselation || self.contours || self.irises)
    }
}
