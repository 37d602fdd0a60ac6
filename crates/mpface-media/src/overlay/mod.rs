//! Face-mesh overlay rendering.

pub mod connections;
pub mod draw;
pub mod renderer;
pub mod tesselation;

use image::Rgb;

/// Line color and thickness of one connection set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingSpec {
    pub color: Rgb<u8>,
    /// Line width in pixels
    pub thickness: u32,
}

impl DrawingSpec {
    pub const fn new(color: Rgb<u8>, thickness: u32) -> Self {
        Self { color, thickness }
    }
}

pub use renderer::{render_overlay, OverlayRenderer};
