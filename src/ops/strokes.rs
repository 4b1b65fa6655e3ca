// ============================================================================
// STROKES - dab / segment rasterization and per-pixel compositing
// ============================================================================
//
// All geometry is evaluated at pixel centres: pixel (x, y) covers
// [x, x+1) × [y, y+1) and is sampled at (x + 0.5, y + 0.5). Input points are
// snapped to the centre of the pixel they fall in, so a 1 px stroke through
// a point touches exactly that pixel. Coverage is binary (no antialiasing),
// which keeps flood-fill boundaries crisp.

use egui::{Pos2, pos2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Background color of every fresh or newly exposed canvas area.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Slack for float comparisons on half-pixel geometry.
const EPS: f32 = 1e-3;

/// How a stroke ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineCap {
    /// Half-disc caps; joins between consecutive segments are round too.
    Round,
    /// Caps extend half the stroke width past each endpoint.
    Square,
}

/// What a primitive writes into the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ink {
    /// Source-over compositing of the given color.
    Color(Rgba<u8>),
    /// Source-replace with the background color.
    Erase,
}

impl Ink {
    /// `(color, replace)` pair used by the compositor.
    pub fn resolve(self) -> (Rgba<u8>, bool) {
        match self {
            Ink::Color(c) => (c, false),
            Ink::Erase => (BACKGROUND, true),
        }
    }
}

/// Composite `src` onto `dst` (straight alpha). Returns true if `dst` changed.
#[inline]
pub fn composite(dst: &mut [u8], src: Rgba<u8>, replace: bool) -> bool {
    let before = [dst[0], dst[1], dst[2], dst[3]];
    let out = if replace || src.0[3] == 255 {
        src.0
    } else if src.0[3] == 0 {
        before
    } else {
        let sa = src.0[3] as f32 / 255.0;
        let da = before[3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            [0, 0, 0, 0]
        } else {
            let mix = |s: u8, d: u8| {
                ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / oa).round().clamp(0.0, 255.0) as u8
            };
            [
                mix(src.0[0], before[0]),
                mix(src.0[1], before[1]),
                mix(src.0[2], before[2]),
                (oa * 255.0).round().clamp(0.0, 255.0) as u8,
            ]
        }
    };
    if out == before {
        return false;
    }
    dst.copy_from_slice(&out);
    true
}

/// Centre of the pixel containing `p`.
#[inline]
pub fn pixel_center(p: Pos2) -> Pos2 {
    pos2(p.x.floor() + 0.5, p.y.floor() + 0.5)
}

/// Half the stroke width, never thinner than one pixel overall.
#[inline]
pub fn half_width(width: f32) -> f32 {
    (width * 0.5).max(0.5)
}

/// Paint every pixel of the clamped region `[x0, x1) × [y0, y1)` whose centre
/// satisfies `inside`. Rows are processed in parallel. Returns true if any
/// pixel changed.
pub fn paint_region<F>(image: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, ink: Ink, inside: F) -> bool
where
    F: Fn(f32, f32) -> bool + Sync,
{
    let (w, h) = image.dimensions();
    let x0 = x0.clamp(0, w as i64) as usize;
    let x1 = x1.clamp(0, w as i64) as usize;
    let y0 = y0.clamp(0, h as i64) as usize;
    let y1 = y1.clamp(0, h as i64) as usize;
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    let (color, replace) = ink.resolve();
    let row_bytes = w as usize * 4;
    let raw: &mut [u8] = &mut *image;

    raw.par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .map(|(y, row)| {
            let cy = y as f32 + 0.5;
            let mut changed = false;
            for x in x0..x1 {
                if inside(x as f32 + 0.5, cy) {
                    changed |= composite(&mut row[x * 4..x * 4 + 4], color, replace);
                }
            }
            changed
        })
        .reduce(|| false, |a, b| a || b)
}

/// Distance from `p` to the segment `a..b`.
#[inline]
pub fn distance_to_segment(px: f32, py: f32, a: Pos2, b: Pos2) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((px - a.x) * dx + (py - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let cx = a.x + dx * t - px;
    let cy = a.y + dy * t - py;
    (cx * cx + cy * cy).sqrt()
}

/// Rasterize a stroked segment from `from` to `to`. A zero-length segment is a
/// single dab (disc for round caps, square for square caps).
pub fn stroke_segment(image: &mut RgbaImage, from: Pos2, to: Pos2, width: f32, cap: LineCap, ink: Ink) -> bool {
    let a = pixel_center(from);
    let b = pixel_center(to);
    let half = half_width(width);

    let pad = half + 1.0;
    let x0 = (a.x.min(b.x) - pad).floor() as i64;
    let y0 = (a.y.min(b.y) - pad).floor() as i64;
    let x1 = (a.x.max(b.x) + pad).ceil() as i64;
    let y1 = (a.y.max(b.y) + pad).ceil() as i64;

    match cap {
        LineCap::Round => paint_region(image, x0, y0, x1, y1, ink, |px, py| {
            distance_to_segment(px, py, a, b) <= half + EPS
        }),
        LineCap::Square => {
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len = (dx * dx + dy * dy).sqrt();
            if len <= f32::EPSILON {
                return paint_region(image, x0, y0, x1, y1, ink, |px, py| {
                    (px - a.x).abs() <= half + EPS && (py - a.y).abs() <= half + EPS
                });
            }
            let ux = dx / len;
            let uy = dy / len;
            paint_region(image, x0, y0, x1, y1, ink, |px, py| {
                let rx = px - a.x;
                let ry = py - a.y;
                let along = rx * ux + ry * uy;
                let across = (rx * uy - ry * ux).abs();
                along >= -half - EPS && along <= len + half + EPS && across <= half + EPS
            })
        }
    }
}

/// A single round dab centred on `p`.
pub fn stroke_dab(image: &mut RgbaImage, p: Pos2, width: f32, ink: Ink) -> bool {
    stroke_segment(image, p, p, width, LineCap::Round, ink)
}
