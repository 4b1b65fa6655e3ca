use egui::Pos2;
use image::{Rgba, RgbaImage};

use crate::canvas::RasterSurface;
use crate::ops::strokes::{Ink, LineCap};
use crate::ops::text::TextStyle;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 100;

// ============================================================================
// DRAWING MODE
// ============================================================================

/// The active tool. Exactly one is selected at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DrawingMode {
    #[default]
    Brush,
    Eraser,
    Rectangle,
    Circle,
    Line,
    Text,
    Fill,
}

impl DrawingMode {
    pub fn label(&self) -> &'static str {
        match self {
            DrawingMode::Brush => "Brush",
            DrawingMode::Eraser => "Eraser",
            DrawingMode::Rectangle => "Rectangle",
            DrawingMode::Circle => "Circle",
            DrawingMode::Line => "Line",
            DrawingMode::Text => "Text",
            DrawingMode::Fill => "Fill",
        }
    }

    pub fn all() -> &'static [DrawingMode] {
        &[
            DrawingMode::Brush,
            DrawingMode::Eraser,
            DrawingMode::Rectangle,
            DrawingMode::Circle,
            DrawingMode::Line,
            DrawingMode::Text,
            DrawingMode::Fill,
        ]
    }

    /// Case-insensitive lookup by label; `ellipse` is accepted for Circle.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("ellipse") {
            return Some(DrawingMode::Circle);
        }
        Self::all().iter().copied().find(|m| m.label().eq_ignore_ascii_case(name))
    }

    /// Paints along the pointer path (Brush, Eraser).
    pub fn is_continuous(&self) -> bool {
        matches!(self, DrawingMode::Brush | DrawingMode::Eraser)
    }

    /// Shape fixed by anchor and release points (Rectangle, Circle, Line).
    pub fn is_bounded(&self) -> bool {
        matches!(self, DrawingMode::Rectangle | DrawingMode::Circle | DrawingMode::Line)
    }

    /// Description recorded in history for a gesture with this tool.
    pub fn history_label(&self) -> &'static str {
        match self {
            DrawingMode::Brush => "Brush Stroke",
            DrawingMode::Eraser => "Eraser Stroke",
            DrawingMode::Rectangle => "Rectangle",
            DrawingMode::Circle => "Ellipse",
            DrawingMode::Line => "Line",
            DrawingMode::Text => "Text",
            DrawingMode::Fill => "Fill",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolProperties {
    pub mode: DrawingMode,
    pub color: Rgba<u8>,
    /// Stroke width in pixels, within [`MIN_BRUSH_SIZE`, `MAX_BRUSH_SIZE`].
    pub size: u32,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            mode: DrawingMode::Brush,
            color: Rgba([0, 0, 0, 255]),
            size: 3,
        }
    }
}

impl ToolProperties {
    fn ink(&self) -> Ink {
        match self.mode {
            DrawingMode::Eraser => Ink::Erase,
            _ => Ink::Color(self.color),
        }
    }

    fn width(&self) -> f32 {
        self.size as f32
    }
}

// ============================================================================
// DRAWING SESSION - per-gesture state machine
// ============================================================================

/// One gesture in flight: tool, anchor, last continuous point, and the
/// full-bitmap snapshot taken before the first mutation.
#[derive(Clone)]
pub struct Gesture {
    pub tool: DrawingMode,
    pub anchor: Pos2,
    /// `None` after the pointer left the image; the next valid move starts a
    /// fresh dab instead of bridging the gap.
    pub last_point: Option<Pos2>,
    pub pre_snapshot: RgbaImage,
}

#[derive(Clone, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Pending(Gesture),
}

#[derive(Default)]
pub struct DrawingSession {
    state: GestureState,
}

impl DrawingSession {
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, GestureState::Pending(_))
    }

    pub fn pending_tool(&self) -> Option<DrawingMode> {
        match &self.state {
            GestureState::Pending(g) => Some(g.tool),
            GestureState::Idle => None,
        }
    }

    fn begin(&mut self, tool: DrawingMode, anchor: Pos2, pre_snapshot: RgbaImage) {
        self.state = GestureState::Pending(Gesture {
            tool,
            anchor,
            last_point: Some(anchor),
            pre_snapshot,
        });
    }

    fn gesture_mut(&mut self) -> Option<&mut Gesture> {
        match &mut self.state {
            GestureState::Pending(g) => Some(g),
            GestureState::Idle => None,
        }
    }

    /// Consume the pending gesture, returning to Idle.
    fn take(&mut self) -> Option<Gesture> {
        match std::mem::take(&mut self.state) {
            GestureState::Pending(g) => Some(g),
            GestureState::Idle => None,
        }
    }
}

/// What a gesture hands back to the editor.
pub enum SessionOutput {
    /// The bitmap changed; `before`/`after` become one history entry.
    Committed {
        description: String,
        before: RgbaImage,
        after: RgbaImage,
    },
    /// A text gesture is waiting for a string at this image position.
    TextEntryRequested { position: Pos2 },
}

impl std::fmt::Debug for SessionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutput::Committed { description, .. } => {
                f.debug_struct("Committed").field("description", description).finish_non_exhaustive()
            }
            SessionOutput::TextEntryRequested { position } => {
                f.debug_struct("TextEntryRequested").field("position", position).finish()
            }
        }
    }
}

// ============================================================================
// TOOL CONTROLLER
// ============================================================================

/// Applies tool selection and properties, and drives gestures against a
/// [`RasterSurface`]. Pointer positions are view coordinates.
#[derive(Default)]
pub struct ToolController {
    properties: ToolProperties,
    session: DrawingSession,
    text_style: Option<TextStyle>,
}

impl ToolController {
    pub fn new(properties: ToolProperties) -> Self {
        Self { properties, ..Default::default() }
    }

    pub fn properties(&self) -> &ToolProperties {
        &self.properties
    }

    pub fn mode(&self) -> DrawingMode {
        self.properties.mode
    }

    pub fn color(&self) -> Rgba<u8> {
        self.properties.color
    }

    pub fn brush_size(&self) -> u32 {
        self.properties.size
    }

    pub fn session(&self) -> &DrawingSession {
        &self.session
    }

    pub fn text_style(&self) -> Option<&TextStyle> {
        self.text_style.as_ref()
    }

    /// Switch tools. Any gesture still in flight is cancelled first.
    pub fn select_tool(&mut self, mode: DrawingMode, surface: &mut RasterSurface) {
        if self.session.is_pending() {
            self.cancel(surface);
        }
        self.properties.mode = mode;
    }

    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.properties.color = color;
    }

    /// Set the stroke width, clamped to the valid range. Returns the value kept.
    pub fn set_brush_size(&mut self, size: i32) -> u32 {
        let size = size.clamp(MIN_BRUSH_SIZE as i32, MAX_BRUSH_SIZE as i32) as u32;
        self.properties.size = size;
        size
    }

    pub fn set_text_style(&mut self, style: Option<TextStyle>) {
        self.text_style = style;
    }

    pub fn set_font_size(&mut self, size: f32) {
        if let Some(style) = self.text_style.as_mut() {
            style.size = size.max(1.0);
        }
    }

    pub fn pointer_down(&mut self, surface: &mut RasterSurface, view_pos: Pos2) -> Option<SessionOutput> {
        match self.session.pending_tool() {
            // A click elsewhere abandons the text prompt and starts over
            Some(DrawingMode::Text) => {
                self.cancel(surface);
            }
            Some(_) => return None,
            None => {}
        }

        let point = surface.map_to_image(view_pos)?;
        let props = self.properties;
        match props.mode {
            DrawingMode::Fill => {
                let target = surface.pixel(point.x as u32, point.y as u32)?;
                if target == props.color {
                    return None;
                }
                let before = surface.snapshot();
                if surface.flood_fill(point, target, props.color) == 0 {
                    return None;
                }
                Some(SessionOutput::Committed {
                    description: props.mode.history_label().to_string(),
                    before,
                    after: surface.snapshot(),
                })
            }
            DrawingMode::Text => {
                self.session.begin(DrawingMode::Text, point, surface.snapshot());
                Some(SessionOutput::TextEntryRequested { position: point })
            }
            mode => {
                self.session.begin(mode, point, surface.snapshot());
                if mode.is_continuous() {
                    surface.draw_point(point, props.ink(), props.width());
                }
                None
            }
        }
    }

    /// Continuous tools draw a segment from the last point; bounded tools
    /// only track the pointer.
    pub fn pointer_move(&mut self, surface: &mut RasterSurface, view_pos: Pos2) {
        let props = self.properties;
        let mapped = surface.map_to_image(view_pos);
        let Some(gesture) = self.session.gesture_mut() else { return };
        if !gesture.tool.is_continuous() {
            return;
        }
        let Some(point) = mapped else {
            gesture.last_point = None;
            return;
        };
        match gesture.last_point {
            Some(last) => {
                surface.draw_line(last, point, props.ink(), props.width(), LineCap::Round);
            }
            None => {
                surface.draw_point(point, props.ink(), props.width());
            }
        }
        gesture.last_point = Some(point);
    }

    /// Finish the gesture. Bounded tools draw their shape here when both
    /// endpoints are on the image. Emits a commit only if pixels changed.
    pub fn pointer_up(&mut self, surface: &mut RasterSurface, view_pos: Pos2) -> Option<SessionOutput> {
        if matches!(self.session.pending_tool(), None | Some(DrawingMode::Text)) {
            return None;
        }
        if self.session.pending_tool().is_some_and(|t| t.is_continuous()) {
            self.pointer_move(surface, view_pos);
        }
        let gesture = self.session.take()?;
        let props = self.properties;

        if gesture.tool.is_bounded()
            && let Some(end) = surface.map_to_image(view_pos)
        {
            let (ink, width) = (props.ink(), props.width());
            match gesture.tool {
                DrawingMode::Rectangle => surface.draw_rectangle(gesture.anchor, end, ink, width),
                DrawingMode::Circle => surface.draw_circle(gesture.anchor, end, ink, width),
                _ => surface.draw_line(gesture.anchor, end, ink, width, LineCap::Square),
            };
        }

        Self::commit(surface, gesture.tool, gesture.pre_snapshot)
    }

    /// End a drag whose release was lost (the pointer moved with the primary
    /// button up). Strokes keep what they painted; shapes have no end point
    /// and draw nothing. Pending text is left alone.
    pub fn release_lost(&mut self, surface: &mut RasterSurface) -> Option<SessionOutput> {
        if matches!(self.session.pending_tool(), None | Some(DrawingMode::Text)) {
            return None;
        }
        let gesture = self.session.take()?;
        Self::commit(surface, gesture.tool, gesture.pre_snapshot)
    }

    /// Resolve a pending text gesture with the supplied string.
    pub fn provide_text(&mut self, surface: &mut RasterSurface, text: &str) -> Option<SessionOutput> {
        if self.session.pending_tool() != Some(DrawingMode::Text) {
            return None;
        }
        let gesture = self.session.take()?;
        if text.is_empty() {
            return None;
        }
        let Some(style) = self.text_style.as_ref() else {
            crate::log_warn!("Text tool: no font configured, '{}' not stamped", text);
            return None;
        };
        surface.stamp_text(gesture.anchor, text, style, self.properties.color);
        Self::commit(surface, DrawingMode::Text, gesture.pre_snapshot)
    }

    /// Abandon the pending gesture without recording history. Any pixels it
    /// already touched are rolled back. Returns whether anything was pending.
    pub fn cancel(&mut self, surface: &mut RasterSurface) -> bool {
        match self.session.take() {
            Some(gesture) => {
                surface.restore_snapshot(&gesture.pre_snapshot);
                true
            }
            None => false,
        }
    }

    fn commit(surface: &RasterSurface, tool: DrawingMode, before: RgbaImage) -> Option<SessionOutput> {
        if surface.matches(&before) {
            return None;
        }
        Some(SessionOutput::Committed {
            description: tool.history_label().to_string(),
            before,
            after: surface.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn setup(mode: DrawingMode) -> (ToolController, RasterSurface) {
        let mut tools = ToolController::default();
        let mut surface = RasterSurface::new(400, 300);
        tools.select_tool(mode, &mut surface);
        (tools, surface)
    }

    #[test]
    fn mode_names_round_trip() {
        for mode in DrawingMode::all() {
            assert_eq!(DrawingMode::from_name(&mode.label().to_uppercase()), Some(*mode));
        }
        assert_eq!(DrawingMode::from_name("ellipse"), Some(DrawingMode::Circle));
        assert_eq!(DrawingMode::from_name("lasso"), None);
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut tools = ToolController::default();
        assert_eq!(tools.set_brush_size(0), 1);
        assert_eq!(tools.set_brush_size(-5), 1);
        assert_eq!(tools.set_brush_size(250), 100);
        assert_eq!(tools.set_brush_size(42), 42);
    }

    #[test]
    fn click_outside_image_stays_idle() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        assert!(tools.pointer_down(&mut surface, pos2(-5.0, 10.0)).is_none());
        assert!(!tools.session().is_pending());
        assert!(tools.pointer_up(&mut surface, pos2(10.0, 10.0)).is_none());
    }

    #[test]
    fn brush_stroke_is_continuous() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        tools.set_brush_size(1);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        tools.pointer_move(&mut surface, pos2(60.0, 10.0));
        let out = tools.pointer_up(&mut surface, pos2(60.0, 10.0));
        assert!(matches!(out, Some(SessionOutput::Committed { .. })));
        for x in 10..=60 {
            assert_eq!(surface.pixel(x, 10), Some(BLACK), "gap at x={x}");
        }
    }

    #[test]
    fn leaving_the_image_breaks_the_stroke() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        tools.set_brush_size(1);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        tools.pointer_move(&mut surface, pos2(10.0, -50.0));
        tools.pointer_move(&mut surface, pos2(50.0, 10.0));
        tools.pointer_up(&mut surface, pos2(50.0, 10.0));
        assert_eq!(surface.pixel(30, 10), Some(WHITE));
        assert_eq!(surface.pixel(50, 10), Some(BLACK));
    }

    #[test]
    fn bounded_tool_draws_only_on_release() {
        let (mut tools, mut surface) = setup(DrawingMode::Line);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        tools.pointer_move(&mut surface, pos2(100.0, 100.0));
        assert!(surface.image().pixels().all(|p| *p == WHITE));
        let out = tools.pointer_up(&mut surface, pos2(100.0, 10.0));
        match out {
            Some(SessionOutput::Committed { description, before, .. }) => {
                assert_eq!(description, "Line");
                assert!(before.pixels().all(|p| *p == WHITE));
            }
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(surface.pixel(50, 10), Some(BLACK));
        assert_eq!(surface.pixel(60, 60), Some(WHITE));
    }

    #[test]
    fn bounded_release_outside_image_commits_nothing() {
        let (mut tools, mut surface) = setup(DrawingMode::Rectangle);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        assert!(tools.pointer_up(&mut surface, pos2(900.0, 10.0)).is_none());
        assert!(!tools.session().is_pending());
    }

    #[test]
    fn second_press_during_drag_is_ignored() {
        let (mut tools, mut surface) = setup(DrawingMode::Rectangle);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        assert!(tools.pointer_down(&mut surface, pos2(200.0, 200.0)).is_none());
        tools.pointer_up(&mut surface, pos2(50.0, 40.0));
        assert_eq!(surface.pixel(10, 10), Some(BLACK));
    }

    #[test]
    fn lost_release_ends_stroke_without_bridging() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        tools.set_brush_size(1);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        tools.pointer_move(&mut surface, pos2(20.0, 10.0));
        let out = tools.release_lost(&mut surface);
        assert!(matches!(out, Some(SessionOutput::Committed { description, .. }) if description == "Brush Stroke"));
        assert!(!tools.session().is_pending());

        // Later moves without a press paint nothing
        tools.pointer_move(&mut surface, pos2(80.0, 10.0));
        assert_eq!(surface.pixel(20, 10), Some(BLACK));
        assert_eq!(surface.pixel(50, 10), Some(WHITE));
        assert!(tools.pointer_down(&mut surface, pos2(100.0, 100.0)).is_none());
        assert!(tools.session().is_pending());
    }

    #[test]
    fn lost_release_drops_shape_and_keeps_text() {
        let (mut tools, mut surface) = setup(DrawingMode::Rectangle);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        assert!(tools.release_lost(&mut surface).is_none());
        assert!(!tools.session().is_pending());

        tools.select_tool(DrawingMode::Text, &mut surface);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        assert!(tools.release_lost(&mut surface).is_none());
        assert_eq!(tools.session().pending_tool(), Some(DrawingMode::Text));
    }

    #[test]
    fn fill_commits_once_and_is_idempotent() {
        let (mut tools, mut surface) = setup(DrawingMode::Fill);
        tools.set_color(Rgba([0, 0, 255, 255]));
        assert!(matches!(
            tools.pointer_down(&mut surface, pos2(5.0, 5.0)),
            Some(SessionOutput::Committed { .. })
        ));
        assert!(!tools.session().is_pending());
        assert!(tools.pointer_down(&mut surface, pos2(5.0, 5.0)).is_none());
    }

    #[test]
    fn text_waits_for_input_and_cancel_discards() {
        let (mut tools, mut surface) = setup(DrawingMode::Text);
        let out = tools.pointer_down(&mut surface, pos2(20.0, 30.0));
        assert!(matches!(out, Some(SessionOutput::TextEntryRequested { position }) if position == pos2(20.0, 30.0)));
        assert!(tools.pointer_up(&mut surface, pos2(20.0, 30.0)).is_none());
        assert_eq!(tools.session().pending_tool(), Some(DrawingMode::Text));
        assert!(tools.cancel(&mut surface));
        assert!(!tools.session().is_pending());
        assert!(tools.provide_text(&mut surface, "late").is_none());
    }

    #[test]
    fn text_without_font_is_skipped() {
        let (mut tools, mut surface) = setup(DrawingMode::Text);
        tools.pointer_down(&mut surface, pos2(20.0, 30.0));
        assert!(tools.provide_text(&mut surface, "hello").is_none());
        assert!(!tools.session().is_pending());
    }

    #[test]
    fn switching_tools_rolls_back_unfinished_stroke() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        tools.pointer_down(&mut surface, pos2(10.0, 10.0));
        assert_eq!(surface.pixel(10, 10), Some(BLACK));
        tools.select_tool(DrawingMode::Eraser, &mut surface);
        assert_eq!(surface.pixel(10, 10), Some(WHITE));
        assert_eq!(tools.mode(), DrawingMode::Eraser);
    }

    #[test]
    fn eraser_restores_background() {
        let (mut tools, mut surface) = setup(DrawingMode::Brush);
        tools.set_brush_size(5);
        tools.pointer_down(&mut surface, pos2(30.0, 30.0));
        tools.pointer_up(&mut surface, pos2(30.0, 30.0));
        tools.select_tool(DrawingMode::Eraser, &mut surface);
        tools.set_brush_size(9);
        tools.pointer_down(&mut surface, pos2(30.0, 30.0));
        assert!(tools.pointer_up(&mut surface, pos2(30.0, 30.0)).is_some());
        assert!(surface.image().pixels().all(|p| *p == WHITE));
    }
}
