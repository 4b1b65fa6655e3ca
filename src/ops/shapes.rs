// ============================================================================
// SHAPES - stroked rectangle and ellipse outlines from two drag corners
// ============================================================================

use egui::{Pos2, pos2};
use image::RgbaImage;

use super::strokes::{Ink, LineCap, half_width, paint_region, pixel_center, stroke_segment};

/// Normalized pixel-centre corners of the box spanned by two drag points,
/// independent of drag direction.
pub fn normalized_corners(a: Pos2, b: Pos2) -> (Pos2, Pos2) {
    let a = pixel_center(a);
    let b = pixel_center(b);
    (pos2(a.x.min(b.x), a.y.min(b.y)), pos2(a.x.max(b.x), a.y.max(b.y)))
}

/// Stroke a rectangle outline with square caps and mitered corners. The pen
/// is centred on the edges through the two corner pixels.
pub fn stroke_rectangle(image: &mut RgbaImage, a: Pos2, b: Pos2, width: f32, ink: Ink) -> bool {
    let (min, max) = normalized_corners(a, b);
    let half = half_width(width);
    let cx = (min.x + max.x) * 0.5;
    let cy = (min.y + max.y) * 0.5;
    let hx = (max.x - min.x) * 0.5;
    let hy = (max.y - min.y) * 0.5;

    // Inner hole only exists when the box is wider than the pen
    let ix = hx - half;
    let iy = hy - half;
    let has_hole = ix > 0.0 && iy > 0.0;

    let pad = half + 1.0;
    paint_region(
        image,
        (min.x - pad).floor() as i64,
        (min.y - pad).floor() as i64,
        (max.x + pad).ceil() as i64,
        (max.y + pad).ceil() as i64,
        ink,
        |px, py| {
            let dx = (px - cx).abs();
            let dy = (py - cy).abs();
            let in_outer = dx <= hx + half && dy <= hy + half;
            let in_inner = has_hole && dx < ix && dy < iy;
            in_outer && !in_inner
        },
    )
}

/// Signed distance to an axis-aligned ellipse centred at the origin
/// (approximation; exact for circles).
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

/// Stroke the outline of the ellipse inscribed in the box spanned by `a` and
/// `b`. A box that is flat in either direction degenerates to a line.
pub fn stroke_ellipse(image: &mut RgbaImage, a: Pos2, b: Pos2, width: f32, ink: Ink) -> bool {
    let (min, max) = normalized_corners(a, b);
    let half = half_width(width);
    let rx = (max.x - min.x) * 0.5;
    let ry = (max.y - min.y) * 0.5;

    if rx < 0.5 || ry < 0.5 {
        return stroke_segment(image, min, max, width, LineCap::Square, ink);
    }

    let cx = min.x + rx;
    let cy = min.y + ry;
    let pad = half + 1.0;
    paint_region(
        image,
        (min.x - pad).floor() as i64,
        (min.y - pad).floor() as i64,
        (max.x + pad).ceil() as i64,
        (max.y + pad).ceil() as i64,
        ink,
        |px, py| sdf_ellipse(px - cx, py - cy, rx, ry).abs() <= half,
    )
}
