//! Raster primitives for the overlay.

use image::{Rgb, RgbImage};

use mpface_models::Landmark;

/// Map a normalized landmark to pixel coordinates.
///
/// Returns `None` when the landmark lies outside the image, in which case
/// connections touching it are not drawn.
pub fn to_pixel(landmark: &Landmark, width: u32, height: u32) -> Option<(i32, i32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_range(landmark.x) || !in_range(landmark.y) {
        return None;
    }

    let px = ((landmark.x * width as f32).floor() as i64).min(width as i64 - 1);
    let py = ((landmark.y * height as f32).floor() as i64).min(height as i64 - 1);
    Some((px as i32, py as i32))
}

/// Stamp a filled disc of the given radius, clipped to the image.
fn stamp(img: &mut RgbImage, x: i32, y: i32, radius: i32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && px < w && py < h {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Draw a line with Bresenham's algorithm and a round brush.
///
/// A thickness of 0 or 1 draws single pixels.
pub fn draw_line(
    img: &mut RgbImage,
    from: (i32, i32),
    to: (i32, i32),
    color: Rgb<u8>,
    thickness: u32,
) {
    let radius = (thickness / 2) as i32;
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(img, x0, y0, radius, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
