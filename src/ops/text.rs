use std::path::Path;
use std::sync::OnceLock;

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use font_kit::family_name::FamilyName;
use font_kit::properties::{Properties, Style, Weight};
use font_kit::source::SystemSource;
use egui::Pos2;
use image::{Rgba, RgbaImage};

use super::strokes::composite;
use crate::io::CanvasError;

/// Font face plus pixel size used by the text tool.
#[derive(Clone)]
pub struct TextStyle {
    pub font: FontArc,
    pub size: f32,
}

impl std::fmt::Debug for TextStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStyle").field("size", &self.size).finish()
    }
}

impl TextStyle {
    pub fn new(font: FontArc, size: f32) -> Self {
        Self { font, size: size.max(1.0) }
    }
}

/// Parse a TTF/OTF face from raw bytes.
pub fn font_from_bytes(bytes: Vec<u8>) -> Result<FontArc, CanvasError> {
    FontArc::try_from_vec(bytes).map_err(|e| CanvasError::Font(e.to_string()))
}

/// Load a TTF/OTF face from disk.
pub fn load_font_file(path: &Path) -> Result<FontArc, CanvasError> {
    font_from_bytes(std::fs::read(path)?)
}

/// Families tried, in order, before the generic sans-serif match.
const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Arial", "Helvetica", "Noto Sans"];

/// Face bundled with egui, used when the system offers no usable font.
const BUNDLED_FACE: &str = "Ubuntu-Light";

/// Load a font by family name, weight, and style from the system.
/// `weight` is a CSS-style weight value (400 = Regular, 700 = Bold).
pub fn load_system_font(family: &str, weight: u16, italic: bool) -> Option<FontArc> {
    let mut props = Properties::new();
    props.weight = Weight(weight as f32);
    if italic {
        props.style = Style::Italic;
    }
    select_system_font(&[FamilyName::Title(family.to_string())], &props)
}

fn select_system_font(families: &[FamilyName], props: &Properties) -> Option<FontArc> {
    let handle = SystemSource::new().select_best_match(families, props).ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    FontArc::try_from_vec((*data).clone()).ok()
}

/// The face egui ships for its own UI text.
pub fn bundled_font() -> Option<FontArc> {
    let defs = egui::FontDefinitions::default();
    let data = defs
        .font_data
        .get(BUNDLED_FACE)
        .or_else(|| defs.font_data.values().next())?;
    FontArc::try_from_vec(data.font.to_vec()).ok()
}

/// Text face used when none is configured: a regular sans-serif from the
/// system, else egui's bundled face. Resolved once per process.
pub fn default_font() -> Option<FontArc> {
    static DEFAULT: OnceLock<Option<FontArc>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| {
            let system = PREFERRED_FAMILIES
                .iter()
                .find_map(|family| load_system_font(family, 400, false))
                .or_else(|| select_system_font(&[FamilyName::SansSerif], &Properties::new()));
            match system {
                Some(font) => Some(font),
                None => {
                    crate::log_info!("Text: no system sans-serif found, using bundled {}", BUNDLED_FACE);
                    bundled_font()
                }
            }
        })
        .clone()
}

/// Lay out one line left-aligned at x=0.
/// Returns `(glyph, x_offset)` pairs; kerning is applied between neighbors.
fn layout_line(font: &FontArc, size: f32, line: &str) -> Vec<(GlyphId, f32)> {
    let scaled = font.as_scaled(size);
    let mut glyphs = Vec::with_capacity(line.len());
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in line.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }
    glyphs
}

/// Stamp `text` with its top-left at `origin`; the first baseline sits at
/// `origin.y + ascent`. `'\n'` starts a new line one line-height lower.
/// Glyph coverage scales the color's alpha and is composited source-over.
/// Returns true if any pixel changed; empty text is a no-op.
pub fn stamp_text(image: &mut RgbaImage, style: &TextStyle, origin: Pos2, text: &str, color: Rgba<u8>) -> bool {
    if text.is_empty() {
        return false;
    }
    let font = &style.font;
    let scaled = font.as_scaled(style.size);
    let ascent = scaled.ascent();
    let line_height = scaled.height() + scaled.line_gap();
    let (w, h) = image.dimensions();
    let mut changed = false;

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline = origin.y + ascent + line_idx as f32 * line_height;
        for (glyph_id, x) in layout_line(font, style.size, line) {
            let glyph = glyph_id.with_scale_and_position(style.size, point(origin.x + x, baseline));
            let Some(outlined) = font.outline_glyph(glyph) else { continue };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, cov| {
                if cov <= 0.001 {
                    return;
                }
                let px = bounds.min.x as i64 + gx as i64;
                let py = bounds.min.y as i64 + gy as i64;
                if px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
                    return;
                }
                let a = (color.0[3] as f32 * cov.min(1.0)).round() as u8;
                let src = Rgba([color.0[0], color.0[1], color.0[2], a]);
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                changed |= composite(&mut pixel.0, src, false);
            });
        }
    }
    changed
}
