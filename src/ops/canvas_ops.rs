// ============================================================================
// CANVAS-LEVEL OPERATIONS - growth, load placement, size conformance
// ============================================================================

use image::imageops::{self, FilterType};
use image::RgbaImage;

use super::strokes::BACKGROUND;
use crate::canvas::{MAX_CANVAS_DIMENSION, MIN_CANVAS_HEIGHT, MIN_CANVAS_WIDTH};

/// Grow `image` so it covers `width × height`, capped at
/// [`MAX_CANVAS_DIMENSION`]. Never shrinks; existing content stays anchored
/// at the origin and new area is background. `None` when no growth is needed.
pub fn grow_to(image: &RgbaImage, width: u32, height: u32) -> Option<RgbaImage> {
    let new_w = width.max(image.width()).min(MAX_CANVAS_DIMENSION).max(image.width());
    let new_h = height.max(image.height()).min(MAX_CANVAS_DIMENSION).max(image.height());
    if new_w == image.width() && new_h == image.height() {
        return None;
    }
    let mut grown = RgbaImage::from_pixel(new_w, new_h, BACKGROUND);
    imageops::replace(&mut grown, image, 0, 0);
    Some(grown)
}

/// Size after fitting `w × h` inside `cap × cap` with the aspect ratio kept.
/// Sizes already within the cap are returned unchanged.
pub fn downscaled_size(w: u32, h: u32, cap: u32) -> (u32, u32) {
    if w <= cap && h <= cap {
        return (w, h);
    }
    let scale = cap as f64 / w.max(h) as f64;
    let nw = ((w as f64 * scale).round() as u32).clamp(1, cap);
    let nh = ((h as f64 * scale).round() as u32).clamp(1, cap);
    (nw, nh)
}

/// Downscale a decoded image so neither edge exceeds the canvas cap.
pub fn fit_within_cap(image: RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let (nw, nh) = downscaled_size(w, h, MAX_CANVAS_DIMENSION);
    if (nw, nh) == (w, h) {
        return image;
    }
    imageops::resize(&image, nw, nh, FilterType::Lanczos3)
}

/// Size of the buffer a loaded image is placed into: at least the viewport,
/// at least the minimum canvas, large enough for the image, at most the cap.
pub fn placement_size(image_w: u32, image_h: u32, viewport_w: u32, viewport_h: u32) -> (u32, u32) {
    let w = viewport_w.max(MIN_CANVAS_WIDTH).max(image_w).min(MAX_CANVAS_DIMENSION);
    let h = viewport_h.max(MIN_CANVAS_HEIGHT).max(image_h).min(MAX_CANVAS_DIMENSION);
    (w, h)
}

/// Load policy: cap the decoded image, then center it on a background
/// buffer sized by [`placement_size`]. Transparent areas of the source are
/// composited over the background.
pub fn place_loaded(decoded: RgbaImage, viewport_w: u32, viewport_h: u32) -> RgbaImage {
    let fitted = fit_within_cap(decoded);
    let (bw, bh) = placement_size(fitted.width(), fitted.height(), viewport_w, viewport_h);
    let mut canvas = RgbaImage::from_pixel(bw, bh, BACKGROUND);
    let x = (bw as i64 - fitted.width() as i64) / 2;
    let y = (bh as i64 - fitted.height() as i64) / 2;
    imageops::overlay(&mut canvas, &fitted, x, y);
    canvas
}

/// Bring an arbitrary buffer inside the canvas size invariants: pad up to the
/// minimum size with background, crop anything beyond the cap.
pub fn conform(image: RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let cw = w.min(MAX_CANVAS_DIMENSION);
    let ch = h.min(MAX_CANVAS_DIMENSION);
    let image = if (cw, ch) != (w, h) {
        imageops::crop_imm(&image, 0, 0, cw, ch).to_image()
    } else {
        image
    };
    match grow_to(&image, MIN_CANVAS_WIDTH, MIN_CANVAS_HEIGHT) {
        Some(grown) => grown,
        None => image,
    }
}
