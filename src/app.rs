use std::path::Path;

use ab_glyph::FontArc;
use egui::{Key, Modifiers, PointerButton, Pos2, Vec2, vec2};
use image::{Rgba, RgbaImage};

use crate::canvas::RasterSurface;
use crate::components::history::{HistoryManager, SnapshotCommand};
use crate::components::tools::{
    DrawingMode, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, SessionOutput, ToolController, ToolProperties,
};
use crate::events::{EditorEvent, EventBus, EventHandler, InputEvent};
use crate::io::{CanvasError, SaveFormat};
use crate::ops::text::{self, TextStyle};
use crate::settings::PaintSettings;

/// The editor core: one surface, one tool controller, one history.
///
/// Every input from the presentation layer goes through [`handle`]; state
/// changes are reported to subscribers through the [`EventBus`].
///
/// [`handle`]: PaintEditor::handle
pub struct PaintEditor {
    surface: RasterSurface,
    tools: ToolController,
    history: HistoryManager,
    bus: EventBus,
    settings: PaintSettings,
}

impl Default for PaintEditor {
    fn default() -> Self {
        Self::new(PaintSettings::default())
    }
}

impl PaintEditor {
    pub fn new(settings: PaintSettings) -> Self {
        let surface = RasterSurface::from_settings(&settings);
        let tools = ToolController::new(ToolProperties {
            mode: DrawingMode::Brush,
            color: settings.color,
            size: settings.brush_size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE),
        });
        let history = HistoryManager::new(settings.history_depth)
            .with_memory_limit(settings.history_memory_mb.map(|mb| mb.saturating_mul(1024 * 1024)));

        let mut editor = Self {
            surface,
            tools,
            history,
            bus: EventBus::new(),
            settings,
        };

        editor.install_configured_font();
        editor
    }

    // ---- accessors ----------------------------------------------------------

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn image(&self) -> &RgbaImage {
        self.surface.image()
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn settings(&self) -> &PaintSettings {
        &self.settings
    }

    pub fn current_tool(&self) -> DrawingMode {
        self.tools.mode()
    }

    pub fn current_color(&self) -> Rgba<u8> {
        self.tools.color()
    }

    pub fn brush_size(&self) -> u32 {
        self.tools.brush_size()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn subscribe(&mut self, handler: impl EventHandler + 'static) {
        self.bus.subscribe(Box::new(handler));
    }

    // ---- fonts ----------------------------------------------------------------

    pub fn set_font(&mut self, font: FontArc) {
        self.tools.set_text_style(Some(TextStyle::new(font, self.settings.font_size)));
    }

    /// Pick the text face: `font_path`, then `font_family`, then the default
    /// system sans-serif (or egui's bundled face).
    fn install_configured_font(&mut self) {
        if let Some(path) = self.settings.font_path.clone() {
            match self.load_font(&path) {
                Ok(()) => return,
                Err(e) => crate::log_warn!("Could not load font {}: {}", path.display(), e),
            }
        }
        if let Some(family) = self.settings.font_family.clone() {
            match text::load_system_font(&family, 400, false) {
                Some(font) => {
                    self.set_font(font);
                    crate::log_info!("Font family '{}' loaded", family);
                    return;
                }
                None => crate::log_warn!("Font family '{}' not found", family),
            }
        }
        match text::default_font() {
            Some(font) => self.set_font(font),
            None => crate::log_warn!("No font available, the text tool is disabled"),
        }
    }

    pub fn load_font(&mut self, path: &Path) -> Result<(), CanvasError> {
        let font = text::load_font_file(path)?;
        self.set_font(font);
        crate::log_info!("Font loaded from {}", path.display());
        Ok(())
    }

    // ---- input dispatch -------------------------------------------------------

    /// Route one input event. Only open and save can fail.
    pub fn handle(&mut self, event: InputEvent) -> Result<(), CanvasError> {
        match event {
            InputEvent::ToolSelected(mode) => self.select_tool(mode),
            InputEvent::ColorChanged(color) => {
                self.tools.set_color(color);
                self.bus.emit(EditorEvent::ColorChanged(color));
            }
            InputEvent::BrushSizeChanged(size) => {
                let kept = self.tools.set_brush_size(size);
                self.bus.emit(EditorEvent::BrushSizeChanged(kept));
            }
            InputEvent::ClearRequested => self.clear(),
            InputEvent::SaveRequested { path, format } => {
                self.save(&path, format)?;
            }
            InputEvent::OpenRequested(path) => self.open(&path)?,
            InputEvent::PointerDown { pos, button } => {
                if button == PointerButton::Primary {
                    let output = self.tools.pointer_down(&mut self.surface, pos);
                    self.apply_output(output);
                }
            }
            InputEvent::PointerMove { pos, primary_down: true } => {
                self.tools.pointer_move(&mut self.surface, pos);
            }
            InputEvent::PointerMove { primary_down: false, .. } => {
                // The release never arrived; end the drag where it last was
                let output = self.tools.release_lost(&mut self.surface);
                self.apply_output(output);
            }
            InputEvent::PointerUp { pos, button } => {
                if button == PointerButton::Primary {
                    let output = self.tools.pointer_up(&mut self.surface, pos);
                    self.apply_output(output);
                }
            }
            InputEvent::Wheel { pos, delta, modifiers } => self.handle_wheel(pos, delta, modifiers),
            InputEvent::Key { key, modifiers } => self.handle_key(key, modifiers),
            InputEvent::TextProvided(text) => {
                let output = self.tools.provide_text(&mut self.surface, &text);
                self.apply_output(output);
            }
            InputEvent::TextCancelled => {
                self.tools.cancel(&mut self.surface);
            }
            InputEvent::ViewportResized(size) => self.set_viewport_size(size),
            InputEvent::Pan { delta } => {
                self.surface.pan_view_pixels(delta);
                self.emit_view_changed();
            }
            InputEvent::Undo => {
                self.undo();
            }
            InputEvent::Redo => {
                self.redo();
            }
        }
        Ok(())
    }

    pub fn select_tool(&mut self, mode: DrawingMode) {
        self.tools.select_tool(mode, &mut self.surface);
        self.bus.emit(EditorEvent::ToolChanged(mode));
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        if self.surface.set_viewport_size(size) {
            self.emit_image_replaced();
        }
        self.emit_view_changed();
    }

    /// Ctrl+Z / Ctrl+Y / Ctrl+Shift+Z, arrows, `+`/`-`/`0`, Escape.
    fn handle_key(&mut self, key: Key, modifiers: Modifiers) {
        let ctrl = modifiers.command || modifiers.ctrl;
        let step = self.settings.pan_step;
        match key {
            Key::Z if ctrl && modifiers.shift => {
                self.redo();
            }
            Key::Z if ctrl => {
                self.undo();
            }
            Key::Y if ctrl => {
                self.redo();
            }
            Key::ArrowLeft => self.pan_by(vec2(step, 0.0)),
            Key::ArrowRight => self.pan_by(vec2(-step, 0.0)),
            Key::ArrowUp => self.pan_by(vec2(0.0, step)),
            Key::ArrowDown => self.pan_by(vec2(0.0, -step)),
            Key::PlusEquals => self.zoom_at_center(1.0),
            Key::Minus => self.zoom_at_center(-1.0),
            Key::Num0 => {
                self.surface.reset_view();
                self.emit_view_changed();
            }
            Key::Escape => {
                self.tools.cancel(&mut self.surface);
            }
            _ => {}
        }
    }

    /// Plain wheel zooms to the cursor; Shift+wheel scrolls vertically.
    fn handle_wheel(&mut self, pos: Pos2, delta: f32, modifiers: Modifiers) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        if modifiers.shift {
            self.pan_by(vec2(0.0, delta * self.settings.pan_step));
        } else {
            self.surface.apply_zoom(pos, delta);
            self.emit_view_changed();
        }
    }

    fn pan_by(&mut self, view_pixels: Vec2) {
        self.surface.pan_view_pixels(view_pixels);
        self.emit_view_changed();
    }

    fn zoom_at_center(&mut self, steps: f32) {
        let center = (self.surface.viewport() * 0.5).to_pos2();
        self.surface.apply_zoom(center, steps);
        self.emit_view_changed();
    }

    // ---- history ----------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.tools.cancel(&mut self.surface);
        match self.history.undo(&mut self.surface) {
            Some(description) => {
                self.bus.emit(EditorEvent::Undone { description });
                self.emit_image_replaced();
                self.emit_history_changed();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.tools.cancel(&mut self.surface);
        match self.history.redo(&mut self.surface) {
            Some(description) => {
                self.bus.emit(EditorEvent::Redone { description });
                self.emit_image_replaced();
                self.emit_history_changed();
                true
            }
            None => false,
        }
    }

    fn apply_output(&mut self, output: Option<SessionOutput>) {
        match output {
            Some(SessionOutput::Committed { description, before, after }) => {
                self.record(description, before, after);
            }
            Some(SessionOutput::TextEntryRequested { position }) => {
                self.bus.emit(EditorEvent::TextEntryRequested { position });
            }
            None => {}
        }
    }

    fn record(&mut self, description: String, before: RgbaImage, after: RgbaImage) {
        let command = SnapshotCommand::new(description.clone(), before, after);
        self.history.execute(Box::new(command), &mut self.surface);
        self.bus.emit(EditorEvent::Committed { description });
        self.emit_history_changed();
    }

    // ---- whole-image actions ------------------------------------------------------

    /// Fill with background and reset the view; undoable when anything changed.
    pub fn clear(&mut self) {
        self.tools.cancel(&mut self.surface);
        let before = self.surface.snapshot();
        if self.surface.clear() {
            self.record("Clear Canvas".to_string(), before, self.surface.snapshot());
        }
        self.emit_image_replaced();
        self.emit_view_changed();
    }

    /// Open an image file with the load policy. On failure the canvas is left
    /// as it was.
    pub fn open(&mut self, path: &Path) -> Result<(), CanvasError> {
        self.tools.cancel(&mut self.surface);
        let before = self.surface.snapshot();
        if let Err(e) = self.surface.load_path(path) {
            crate::log_err!("Failed to open {}: {}", path.display(), e);
            return Err(e);
        }
        self.after_load(before);
        Ok(())
    }

    pub fn open_bytes(&mut self, bytes: &[u8]) -> Result<(), CanvasError> {
        self.tools.cancel(&mut self.surface);
        let before = self.surface.snapshot();
        self.surface.load_bytes(bytes)?;
        self.after_load(before);
        Ok(())
    }

    fn after_load(&mut self, before: RgbaImage) {
        if !self.surface.matches(&before) {
            self.record("Open Image".to_string(), before, self.surface.snapshot());
        }
        self.emit_image_replaced();
        self.emit_view_changed();
    }

    pub fn save(&mut self, path: &Path, format: Option<SaveFormat>) -> Result<SaveFormat, CanvasError> {
        match self.surface.save(path, format) {
            Ok(format) => {
                self.bus.emit(EditorEvent::ImageSaved { path: path.to_path_buf(), format });
                Ok(format)
            }
            Err(e) => {
                crate::log_err!("Failed to save {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    // ---- notifications -------------------------------------------------------------

    fn emit_history_changed(&mut self) {
        self.bus.emit(EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    fn emit_view_changed(&mut self) {
        self.bus.emit(EditorEvent::ViewChanged {
            zoom: self.surface.zoom(),
            pan: self.surface.pan_offset(),
        });
    }

    fn emit_image_replaced(&mut self) {
        self.bus.emit(EditorEvent::ImageReplaced {
            width: self.surface.width(),
            height: self.surface.height(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn recording_editor() -> (PaintEditor, Arc<Mutex<Vec<EditorEvent>>>) {
        let mut editor = PaintEditor::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        editor.subscribe(move |e: &EditorEvent| sink.lock().unwrap().push(e.clone()));
        (editor, log)
    }

    fn key(editor: &mut PaintEditor, key: Key, modifiers: Modifiers) {
        editor.handle(InputEvent::Key { key, modifiers }).unwrap();
    }

    fn click(editor: &mut PaintEditor, x: f32, y: f32) {
        let pos = pos2(x, y);
        editor.handle(InputEvent::PointerDown { pos, button: PointerButton::Primary }).unwrap();
        editor.handle(InputEvent::PointerUp { pos, button: PointerButton::Primary }).unwrap();
    }

    #[test]
    fn keyboard_undo_redo() {
        let mut editor = PaintEditor::default();
        click(&mut editor, 50.0, 50.0);
        assert!(editor.can_undo());
        key(&mut editor, Key::Z, Modifiers::COMMAND);
        assert_eq!(editor.surface().pixel(50, 50), Some(Rgba([255, 255, 255, 255])));
        key(&mut editor, Key::Z, Modifiers { command: true, shift: true, ..Default::default() });
        assert_eq!(editor.surface().pixel(50, 50), Some(Rgba([0, 0, 0, 255])));
        key(&mut editor, Key::Z, Modifiers::COMMAND);
        key(&mut editor, Key::Y, Modifiers::CTRL);
        assert_eq!(editor.surface().pixel(50, 50), Some(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn secondary_button_does_not_draw() {
        let mut editor = PaintEditor::default();
        let pos = pos2(50.0, 50.0);
        editor.handle(InputEvent::PointerDown { pos, button: PointerButton::Secondary }).unwrap();
        editor.handle(InputEvent::PointerUp { pos, button: PointerButton::Secondary }).unwrap();
        assert!(!editor.can_undo());
    }

    #[test]
    fn zoom_keys_and_reset() {
        let mut editor = PaintEditor::default();
        key(&mut editor, Key::PlusEquals, Modifiers::NONE);
        assert!((editor.surface().zoom() - 1.15).abs() < 1e-5);
        key(&mut editor, Key::Minus, Modifiers::NONE);
        key(&mut editor, Key::Minus, Modifiers::NONE);
        assert!(editor.surface().zoom() < 1.0);
        key(&mut editor, Key::Num0, Modifiers::NONE);
        assert_eq!(editor.surface().zoom(), 1.0);
    }

    #[test]
    fn arrow_pan_has_constant_screen_speed() {
        let mut editor = PaintEditor::default();
        editor.handle(InputEvent::Wheel { pos: pos2(0.0, 0.0), delta: 5.0, modifiers: Modifiers::NONE }).unwrap();
        let zoom = editor.surface().zoom();
        let before = editor.surface().image_to_view(pos2(100.0, 100.0));
        key(&mut editor, Key::ArrowRight, Modifiers::NONE);
        let after = editor.surface().image_to_view(pos2(100.0, 100.0));
        assert!((before.x - after.x - editor.settings().pan_step).abs() < 1e-2, "zoom {zoom}");
    }

    #[test]
    fn shift_wheel_pans_instead_of_zooming() {
        let mut editor = PaintEditor::default();
        editor.handle(InputEvent::Wheel { pos: pos2(10.0, 10.0), delta: 1.0, modifiers: Modifiers::SHIFT }).unwrap();
        assert_eq!(editor.surface().zoom(), 1.0);
        assert_eq!(editor.surface().pan_offset(), vec2(0.0, editor.settings().pan_step));
    }

    #[test]
    fn escape_cancels_pending_text() {
        let (mut editor, log) = recording_editor();
        editor.select_tool(DrawingMode::Text);
        editor.handle(InputEvent::PointerDown { pos: pos2(30.0, 30.0), button: PointerButton::Primary }).unwrap();
        assert!(log.lock().unwrap().iter().any(|e| matches!(e, EditorEvent::TextEntryRequested { .. })));
        key(&mut editor, Key::Escape, Modifiers::NONE);
        assert!(!editor.tools().session().is_pending());
        assert!(!editor.can_undo());
    }

    #[test]
    fn clear_is_undoable_only_when_dirty() {
        let (mut editor, log) = recording_editor();
        editor.handle(InputEvent::ClearRequested).unwrap();
        assert!(!editor.can_undo());
        click(&mut editor, 10.0, 10.0);
        editor.handle(InputEvent::ClearRequested).unwrap();
        assert_eq!(editor.history().undo_description().as_deref(), Some("Clear Canvas"));
        assert!(log.lock().unwrap().contains(&EditorEvent::Committed { description: "Clear Canvas".into() }));
        editor.undo();
        assert_eq!(editor.surface().pixel(10, 10), Some(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn property_changes_are_broadcast() {
        let (mut editor, log) = recording_editor();
        editor.handle(InputEvent::BrushSizeChanged(500)).unwrap();
        editor.handle(InputEvent::ColorChanged(Rgba([1, 2, 3, 255]))).unwrap();
        editor.handle(InputEvent::ToolSelected(DrawingMode::Fill)).unwrap();
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                EditorEvent::BrushSizeChanged(100),
                EditorEvent::ColorChanged(Rgba([1, 2, 3, 255])),
                EditorEvent::ToolChanged(DrawingMode::Fill),
            ]
        );
        assert_eq!(editor.brush_size(), 100);
    }

    #[test]
    fn failed_open_leaves_canvas_untouched() {
        let mut editor = PaintEditor::default();
        click(&mut editor, 10.0, 10.0);
        let before = editor.image().clone();
        assert!(editor.open_bytes(b"not an image").is_err());
        assert!(editor.surface().matches(&before));
        assert_eq!(editor.history().undo_count(), 1);
    }

    #[test]
    fn default_editor_stamps_text() {
        let (mut editor, log) = recording_editor();
        editor.select_tool(DrawingMode::Text);
        editor.handle(InputEvent::PointerDown { pos: pos2(40.0, 60.0), button: PointerButton::Primary }).unwrap();
        editor.handle(InputEvent::TextProvided("Hello".into())).unwrap();
        assert!(editor.can_undo());
        assert!(log.lock().unwrap().contains(&EditorEvent::Committed { description: "Text".into() }));
    }

    #[test]
    fn unreadable_font_path_falls_back_to_default_face() {
        let settings = PaintSettings {
            font_path: Some(PathBuf::from("/nonexistent/face.ttf")),
            ..PaintSettings::default()
        };
        let mut editor = PaintEditor::new(settings);
        editor.select_tool(DrawingMode::Text);
        editor.handle(InputEvent::PointerDown { pos: pos2(40.0, 60.0), button: PointerButton::Primary }).unwrap();
        editor.handle(InputEvent::TextProvided("Hi".into())).unwrap();
        assert!(editor.can_undo());
    }

    #[test]
    fn nan_zoom_settings_do_not_panic() {
        let mut editor = PaintEditor::new(PaintSettings::parse("min_zoom=nan\nmax_zoom=nan\nzoom_base=nan\n"));
        editor.handle(InputEvent::Wheel { pos: pos2(10.0, 10.0), delta: 1.0, modifiers: Modifiers::NONE }).unwrap();
        assert!((editor.surface().zoom() - 1.15).abs() < 1e-5);
    }

    #[test]
    fn move_without_button_ends_a_stroke() {
        let mut editor = PaintEditor::default();
        editor.handle(InputEvent::PointerDown { pos: pos2(10.0, 10.0), button: PointerButton::Primary }).unwrap();
        editor.handle(InputEvent::PointerMove { pos: pos2(20.0, 10.0), primary_down: true }).unwrap();
        // Release lost; the pointer wanders with the button up
        editor.handle(InputEvent::PointerMove { pos: pos2(200.0, 10.0), primary_down: false }).unwrap();
        editor.handle(InputEvent::PointerMove { pos: pos2(300.0, 10.0), primary_down: true }).unwrap();
        assert_eq!(editor.history().undo_description().as_deref(), Some("Brush Stroke"));
        assert!(!editor.tools().session().is_pending());
        assert_eq!(editor.surface().pixel(150, 10), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(editor.surface().pixel(250, 10), Some(Rgba([255, 255, 255, 255])));
    }
}
