use std::path::{Path, PathBuf};

use image::Rgba;

use crate::canvas::{MAX_ZOOM, MIN_ZOOM, ZOOM_STEP_BASE};
use crate::components::tools::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
use crate::io::CanvasError;

/// Editor settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct PaintSettings {
    /// Maximum number of undo steps kept in history
    pub history_depth: usize,
    /// Optional history memory ceiling in megabytes (None = count cap only)
    pub history_memory_mb: Option<usize>,
    /// Size of the blank canvas created at startup
    pub initial_width: u32,
    pub initial_height: u32,
    /// Initial brush size in pixels, clamped to [1, 100]
    pub brush_size: u32,
    /// Initial drawing color
    pub color: Rgba<u8>,
    /// Pixel size used by the text tool
    pub font_size: f32,
    /// TTF/OTF file loaded for the text tool; wins over `font_family`
    pub font_path: Option<PathBuf>,
    /// System font family for the text tool (None = default sans-serif)
    pub font_family: Option<String>,
    /// Arrow-key pan distance in view pixels
    pub pan_step: f32,
    /// Per-wheel-step zoom multiplier
    pub zoom_base: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for PaintSettings {
    fn default() -> Self {
        Self {
            history_depth: 20,
            history_memory_mb: None,
            initial_width: 1024,
            initial_height: 768,
            brush_size: 3,
            color: Rgba([0, 0, 0, 255]),
            font_size: 24.0,
            font_path: None,
            font_family: None,
            pan_step: 20.0,
            zoom_base: ZOOM_STEP_BASE,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl PaintSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/paintcore/paintcore_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PaintCore\paintcore_settings.cfg
    /// On macOS:   ~/Library/Application Support/PaintCore/paintcore_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("PaintCore")
                    .join("paintcore_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PaintCore")
                    .join("paintcore_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = match std::env::var("XDG_CONFIG_HOME") {
                Ok(xdg) => PathBuf::from(xdg),
                Err(_) => PathBuf::from(std::env::var("HOME").ok()?).join(".config"),
            };
            Some(config_dir.join("paintcore").join("paintcore_settings.cfg"))
        }
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`. A missing or unreadable file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys and unparsable values are skipped
    /// individually; every other key keeps its default.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "history_depth" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.history_depth = v.max(1);
                    }
                }
                "history_memory_mb" => {
                    s.history_memory_mb = match val {
                        "" | "none" | "off" => None,
                        _ => val.parse().ok().or(s.history_memory_mb),
                    };
                }
                "initial_width" => {
                    if let Ok(v) = val.parse() {
                        s.initial_width = v;
                    }
                }
                "initial_height" => {
                    if let Ok(v) = val.parse() {
                        s.initial_height = v;
                    }
                }
                "brush_size" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.brush_size = v.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
                    }
                }
                "color" => {
                    if let Some(c) = parse_hex_color(val) {
                        s.color = c;
                    }
                }
                "font_size" => {
                    if let Some(v) = parse_finite(val)
                        && v > 0.0
                    {
                        s.font_size = v;
                    }
                }
                "font_path" => {
                    s.font_path = if val.is_empty() { None } else { Some(PathBuf::from(val)) };
                }
                "font_family" => {
                    s.font_family = if val.is_empty() { None } else { Some(val.to_string()) };
                }
                "pan_step" => {
                    if let Some(v) = parse_finite(val)
                        && v > 0.0
                    {
                        s.pan_step = v;
                    }
                }
                "zoom_base" => {
                    if let Some(v) = parse_finite(val)
                        && v > 1.0
                    {
                        s.zoom_base = v;
                    }
                }
                "min_zoom" => {
                    if let Some(v) = parse_finite(val) {
                        s.min_zoom = v.clamp(MIN_ZOOM, MAX_ZOOM);
                    }
                }
                "max_zoom" => {
                    if let Some(v) = parse_finite(val) {
                        s.max_zoom = v.clamp(MIN_ZOOM, MAX_ZOOM);
                    }
                }
                _ => {}
            }
        }
        if s.min_zoom > s.max_zoom {
            std::mem::swap(&mut s.min_zoom, &mut s.max_zoom);
        }
        s
    }

    /// Serialize to the `key=value` form read by [`PaintSettings::parse`].
    pub fn to_config_string(&self) -> String {
        let memory = self
            .history_memory_mb
            .map_or_else(|| "none".to_string(), |mb| mb.to_string());
        let font_path = self
            .font_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        format!(
            "history_depth={}\n\
             history_memory_mb={}\n\
             initial_width={}\n\
             initial_height={}\n\
             brush_size={}\n\
             color={}\n\
             font_size={}\n\
             font_path={}\n\
             font_family={}\n\
             pan_step={}\n\
             zoom_base={}\n\
             min_zoom={}\n\
             max_zoom={}\n",
            self.history_depth,
            memory,
            self.initial_width,
            self.initial_height,
            self.brush_size,
            format_hex_color(self.color),
            self.font_size,
            font_path,
            self.font_family.as_deref().unwrap_or_default(),
            self.pan_step,
            self.zoom_base,
            self.min_zoom,
            self.max_zoom,
        )
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CanvasError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), CanvasError> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }
}

/// `f32` parse that rejects `nan` and `inf`, which `str::parse` accepts.
fn parse_finite(val: &str) -> Option<f32> {
    val.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => None,
    }
}

pub fn format_hex_color(c: Rgba<u8>) -> String {
    let [r, g, b, a] = c.0;
    format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
}
