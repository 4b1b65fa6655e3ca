use std::path::Path;

use egui::{Pos2, Rect, Vec2, pos2, vec2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::io::{self, CanvasError, SaveFormat};
use crate::ops::canvas_ops;
use crate::ops::fill;
use crate::ops::shapes;
use crate::ops::strokes::{self, BACKGROUND, Ink, LineCap};
use crate::ops::text::{self, TextStyle};
use crate::settings::PaintSettings;

/// Smallest canvas the surface will ever hold.
pub const MIN_CANVAS_WIDTH: u32 = 400;
pub const MIN_CANVAS_HEIGHT: u32 = 300;
/// Hard cap on either canvas edge; bounds snapshot memory and fill cost.
pub const MAX_CANVAS_DIMENSION: u32 = 2048;

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 8.0;
/// Zoom multiplier per wheel step.
pub const ZOOM_STEP_BASE: f32 = 1.15;

// ============================================================================
// VIEW TRANSFORM
// ============================================================================

/// Zoom and pan of the image inside the viewport.
///
/// The image is centred in the viewport at `zoom`, then shifted by
/// `pan_offset` (image-space units, so the same offset keeps the same content
/// in view at any zoom):
///
/// ```text
/// view  = center + (image - size/2 + pan) * zoom
/// image = (view - center) / zoom + size/2 - pan
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { zoom: 1.0, pan_offset: Vec2::ZERO }
    }
}

impl ViewTransform {
    /// Unchecked inverse mapping; the result may lie outside the image.
    pub fn view_to_image(&self, view: Pos2, viewport: Vec2, image_size: Vec2) -> Pos2 {
        let center = viewport * 0.5;
        pos2(
            (view.x - center.x) / self.zoom + image_size.x * 0.5 - self.pan_offset.x,
            (view.y - center.y) / self.zoom + image_size.y * 0.5 - self.pan_offset.y,
        )
    }

    pub fn image_to_view(&self, image: Pos2, viewport: Vec2, image_size: Vec2) -> Pos2 {
        let center = viewport * 0.5;
        pos2(
            center.x + (image.x - image_size.x * 0.5 + self.pan_offset.x) * self.zoom,
            center.y + (image.y - image_size.y * 0.5 + self.pan_offset.y) * self.zoom,
        )
    }

    /// Where the whole image is drawn, in view coordinates.
    pub fn image_rect(&self, viewport: Vec2, image_size: Vec2) -> Rect {
        Rect::from_min_max(
            self.image_to_view(Pos2::ZERO, viewport, image_size),
            self.image_to_view(image_size.to_pos2(), viewport, image_size),
        )
    }
}

// ============================================================================
// RASTER SURFACE
// ============================================================================

/// The editable bitmap plus its view state.
///
/// All drawing coordinates are image space (`Pos2`, sub-pixel allowed).
/// Every primitive bounds-checks its endpoints and is a no-op (returns
/// `false`) when any of them falls outside the image.
pub struct RasterSurface {
    image: RgbaImage,
    view: ViewTransform,
    viewport: Vec2,
    min_zoom: f32,
    max_zoom: f32,
    zoom_base: f32,
    /// Bumped on every pixel mutation so presenters know when to re-upload.
    generation: u64,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::from_settings(&PaintSettings::default())
    }
}

impl RasterSurface {
    /// A white canvas of the given size (clamped into the size invariants).
    pub fn new(width: u32, height: u32) -> Self {
        let w = width.clamp(MIN_CANVAS_WIDTH, MAX_CANVAS_DIMENSION);
        let h = height.clamp(MIN_CANVAS_HEIGHT, MAX_CANVAS_DIMENSION);
        Self {
            image: RgbaImage::from_pixel(w, h, BACKGROUND),
            view: ViewTransform::default(),
            viewport: vec2(w as f32, h as f32),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            zoom_base: ZOOM_STEP_BASE,
            generation: 0,
        }
    }

    pub fn from_settings(settings: &PaintSettings) -> Self {
        let mut surface = Self::new(settings.initial_width, settings.initial_height);
        // Settings fields are public; non-finite values fall back to the limits
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        surface.min_zoom = finite_or(settings.min_zoom, MIN_ZOOM).clamp(MIN_ZOOM, MAX_ZOOM);
        surface.max_zoom = finite_or(settings.max_zoom, MAX_ZOOM).clamp(surface.min_zoom, MAX_ZOOM);
        if settings.zoom_base.is_finite() && settings.zoom_base > 1.0 {
            surface.zoom_base = settings.zoom_base;
        }
        surface
    }

    // ---- accessors ----------------------------------------------------------

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.image.width() as f32, self.image.height() as f32)
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn zoom(&self) -> f32 {
        self.view.zoom
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.view.pan_offset
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Independent deep copy of the current pixels.
    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }

    /// True if the live pixels equal `other` exactly.
    pub fn matches(&self, other: &RgbaImage) -> bool {
        images_equal(&self.image, other)
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.generation = self.generation.wrapping_add(1);
        }
        changed
    }

    // ---- coordinate mapping ------------------------------------------------

    /// Map a view point into the image. `None` when the point lies outside the
    /// image; edge pixels are inside, nothing is clamped.
    pub fn map_to_image(&self, view_point: Pos2) -> Option<Pos2> {
        let p = self.view.view_to_image(view_point, self.viewport, self.size());
        self.contains(p).then_some(p)
    }

    /// Like [`map_to_image`](Self::map_to_image) but yields the pixel index.
    pub fn map_to_pixel(&self, view_point: Pos2) -> Option<(u32, u32)> {
        self.map_to_image(view_point).map(|p| (p.x as u32, p.y as u32))
    }

    pub fn image_to_view(&self, image_point: Pos2) -> Pos2 {
        self.view.image_to_view(image_point, self.viewport, self.size())
    }

    /// Where the image is drawn inside the viewport.
    pub fn image_rect(&self) -> Rect {
        self.view.image_rect(self.viewport, self.size())
    }

    pub fn contains(&self, p: Pos2) -> bool {
        p.x.is_finite()
            && p.y.is_finite()
            && p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.image.width() as f32
            && p.y < self.image.height() as f32
    }

    // ---- drawing primitives -------------------------------------------------

    /// Round dab of diameter `width`.
    pub fn draw_point(&mut self, p: Pos2, ink: Ink, width: f32) -> bool {
        if !self.contains(p) {
            return false;
        }
        let changed = strokes::stroke_dab(&mut self.image, p, width, ink);
        self.touch(changed)
    }

    pub fn draw_line(&mut self, from: Pos2, to: Pos2, ink: Ink, width: f32, cap: LineCap) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        let changed = strokes::stroke_segment(&mut self.image, from, to, width, cap, ink);
        self.touch(changed)
    }

    pub fn draw_rectangle(&mut self, a: Pos2, b: Pos2, ink: Ink, width: f32) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let changed = shapes::stroke_rectangle(&mut self.image, a, b, width, ink);
        self.touch(changed)
    }

    /// Ellipse inscribed in the box spanned by `a` and `b`.
    pub fn draw_circle(&mut self, a: Pos2, b: Pos2, ink: Ink, width: f32) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let changed = shapes::stroke_ellipse(&mut self.image, a, b, width, ink);
        self.touch(changed)
    }

    /// Fill the region of `target`-colored pixels connected to `seed`.
    /// Returns the number of pixels repainted.
    pub fn flood_fill(&mut self, seed: Pos2, target: Rgba<u8>, replacement: Rgba<u8>) -> usize {
        if !self.contains(seed) {
            return 0;
        }
        let filled = fill::flood_fill(&mut self.image, (seed.x as u32, seed.y as u32), target, replacement);
        self.touch(filled > 0);
        filled
    }

    /// Flood fill using the color currently under `seed` as the target.
    pub fn flood_fill_at(&mut self, seed: Pos2, replacement: Rgba<u8>) -> usize {
        if !self.contains(seed) {
            return 0;
        }
        let filled = fill::flood_fill_at(&mut self.image, (seed.x as u32, seed.y as u32), replacement);
        self.touch(filled > 0);
        filled
    }

    /// Stamp text with its top-left at `position` (baseline = y + ascent).
    pub fn stamp_text(&mut self, position: Pos2, text: &str, style: &TextStyle, color: Rgba<u8>) -> bool {
        if text.is_empty() || !self.contains(position) {
            return false;
        }
        let changed = text::stamp_text(&mut self.image, style, position, text, color);
        self.touch(changed)
    }

    // ---- whole-image operations ---------------------------------------------

    /// Grow to at least `width × height` (capped). Never shrinks.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        match canvas_ops::grow_to(&self.image, width, height) {
            Some(grown) => {
                crate::log_info!(
                    "Canvas grown {}x{} -> {}x{}",
                    self.image.width(),
                    self.image.height(),
                    grown.width(),
                    grown.height()
                );
                self.image = grown;
                self.touch(true)
            }
            None => false,
        }
    }

    /// Record the widget size; the canvas grows to cover it (up to the cap).
    pub fn set_viewport_size(&mut self, size: Vec2) -> bool {
        self.viewport = vec2(size.x.max(0.0), size.y.max(0.0));
        self.resize_canvas(self.viewport.x as u32, self.viewport.y as u32)
    }

    /// Fill with background and reset the view. Returns true if pixels changed.
    pub fn clear(&mut self) -> bool {
        self.reset_view();
        let raw: &mut [u8] = &mut self.image;
        let changed = raw
            .par_chunks_mut(4)
            .map(|px| strokes::composite(px, BACKGROUND, true))
            .reduce(|| false, |a, b| a || b);
        self.touch(changed)
    }

    /// Replace the image wholesale (conformed to the size invariants) and
    /// reset the view.
    pub fn set_image(&mut self, image: RgbaImage) {
        self.image = canvas_ops::conform(image);
        self.reset_view();
        self.touch(true);
    }

    /// Restore a history snapshot. The view is left alone.
    pub fn restore_snapshot(&mut self, snapshot: &RgbaImage) {
        if images_equal(&self.image, snapshot) {
            return;
        }
        self.image = snapshot.clone();
        self.touch(true);
    }

    /// Decode `bytes` and install them via the load policy: downscale to the
    /// cap, center on a background buffer at least the viewport in size, reset
    /// the view. On error the current image is untouched.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), CanvasError> {
        let decoded = io::decode_bytes(bytes)?;
        self.install_loaded(decoded);
        Ok(())
    }

    pub fn load_path(&mut self, path: &Path) -> Result<(), CanvasError> {
        let decoded = io::read_image(path)?;
        crate::log_info!("Loaded {} ({}x{})", path.display(), decoded.width(), decoded.height());
        self.install_loaded(decoded);
        Ok(())
    }

    fn install_loaded(&mut self, decoded: RgbaImage) {
        let placed = canvas_ops::place_loaded(decoded, self.viewport.x as u32, self.viewport.y as u32);
        self.image = placed;
        self.reset_view();
        self.touch(true);
    }

    /// Encode the current buffer. Format: explicit hint, else extension, else PNG.
    pub fn save(&self, path: &Path, format: Option<SaveFormat>) -> Result<SaveFormat, CanvasError> {
        let format = SaveFormat::resolve(format, path);
        io::encode_and_write(&self.image, path, format)?;
        crate::log_info!("Saved {} as {:?}", path.display(), format);
        Ok(format)
    }

    // ---- view ---------------------------------------------------------------

    pub fn reset_view(&mut self) {
        self.view = ViewTransform::default();
    }

    /// Exponential zoom by `steps` wheel steps, keeping the image point under
    /// `cursor` fixed in view space. Returns the new zoom.
    pub fn apply_zoom(&mut self, cursor: Pos2, steps: f32) -> f32 {
        let factor = self.zoom_base.powf(steps);
        self.zoom_around(cursor, factor)
    }

    /// Multiply zoom by `factor` (clamped) around a view-space anchor.
    pub fn zoom_around(&mut self, anchor: Pos2, factor: f32) -> f32 {
        if !factor.is_finite() || factor <= 0.0 {
            return self.view.zoom;
        }
        let size = self.size();
        let under_cursor = self.view.view_to_image(anchor, self.viewport, size);
        let new_zoom = (self.view.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        let center = self.viewport * 0.5;
        // Solve image_to_view(under_cursor) == anchor for the new pan
        self.view.pan_offset = vec2(
            (anchor.x - center.x) / new_zoom - under_cursor.x + size.x * 0.5,
            (anchor.y - center.y) / new_zoom - under_cursor.y + size.y * 0.5,
        );
        self.view.zoom = new_zoom;
        new_zoom
    }

    /// Translate the view by an image-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.view.pan_offset += delta;
    }

    /// Pan by `view_pixels` on screen; converted to image units so the visual
    /// speed is the same at every zoom level.
    pub fn pan_view_pixels(&mut self, view_pixels: Vec2) {
        self.pan(view_pixels / self.view.zoom);
    }
}

/// Exact pixel equality, compared in parallel chunks.
pub fn images_equal(a: &RgbaImage, b: &RgbaImage) -> bool {
    const CHUNK: usize = 64 * 1024;
    a.dimensions() == b.dimensions()
        && a.as_raw()
            .par_chunks(CHUNK)
            .zip(b.as_raw().par_chunks(CHUNK))
            .all(|(x, y)| x == y)
}
