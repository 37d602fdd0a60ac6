//! Landmark overlay renderer.

use image::RgbImage;
use mpface_models::{DetectionResult, FaceResult, OverlayStyle};

use super::connections::{Connection, CONTOUR_GROUPS, IRIS_GROUPS, TESSELATION_SPEC};
use super::draw::{draw_line, to_pixel};
use super::tesselation::tesselation_connections;
use super::DrawingSpec;

/// Draw the enabled overlay passes for every detected face onto a copy of
/// `frame`.
///
/// Faces are drawn in detection order. Within a face the tesselation goes
/// first, then contours, then irises, so later passes paint over earlier
/// ones. The input frame is never modified.
pub fn render_overlay(frame: &RgbImage, result: &DetectionResult, style: OverlayStyle) -> RgbImage {
    let mut canvas = frame.clone();
    if style.is_empty() {
        return canvas;
    }

    for face in &result.faces {
        if style.tesselation {
            draw_connections(&mut canvas, face, tesselation_connections(), TESSELATION_SPEC);
        }
        if style.contours {
            for group in CONTOUR_GROUPS {
                draw_connections(&mut canvas, face, group.connections, group.spec);
            }
        }
        if style.irises {
            for group in IRIS_GROUPS {
                draw_connections(&mut canvas, face, group.connections, group.spec);
            }
        }
    }

    canvas
}

fn draw_connections(
    canvas: &mut RgbImage,
    face: &FaceResult,
    connections: &[Connection],
    spec: DrawingSpec,
) {
    let (width, height) = canvas.dimensions();
    for &(a, b) in connections {
        let (Some(la), Some(lb)) = (face.landmarks.get(a), face.landmarks.get(b)) else {
            continue;
        };
        let (Some(pa), Some(pb)) = (to_pixel(la, width, height), to_pixel(lb, width, height))
        else {
            continue;
        };
        draw_line(canvas, pa, pb, spec.color, spec.thickness);
    }
}

/// Overlay renderer bound to a fixed set of passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> OverlayStyle {
        self.style
    }

    /// See [`render_overlay`].
    pub fn render(&self, frame: &RgbImage, result: &DetectionResult) -> RgbImage {
        render_overlay(frame, result, self.style)
    }
}
