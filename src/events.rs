use std::path::PathBuf;

use egui::{Key, Modifiers, PointerButton, Pos2, Vec2};
use image::Rgba;

use crate::components::tools::DrawingMode;
use crate::io::SaveFormat;

/// Everything the presentation layer can ask of the editor.
/// Pointer, wheel and pan positions are view coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    ToolSelected(DrawingMode),
    ColorChanged(Rgba<u8>),
    /// Raw value; clamped to the valid brush range on arrival.
    BrushSizeChanged(i32),
    ClearRequested,
    SaveRequested { path: PathBuf, format: Option<SaveFormat> },
    OpenRequested(PathBuf),
    PointerDown { pos: Pos2, button: PointerButton },
    /// `primary_down` is the primary button state reported with the move.
    PointerMove { pos: Pos2, primary_down: bool },
    PointerUp { pos: Pos2, button: PointerButton },
    /// `delta` is in wheel steps (positive zooms in).
    Wheel { pos: Pos2, delta: f32, modifiers: Modifiers },
    Key { key: Key, modifiers: Modifiers },
    TextProvided(String),
    TextCancelled,
    ViewportResized(Vec2),
    /// Pan by a distance in view pixels.
    Pan { delta: Vec2 },
    Undo,
    Redo,
}

/// Notifications broadcast to subscribers after the editor state changes.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// A history entry was recorded.
    Committed { description: String },
    /// A text gesture needs a string; answer with `TextProvided`/`TextCancelled`.
    TextEntryRequested { position: Pos2 },
    Undone { description: String },
    Redone { description: String },
    ToolChanged(DrawingMode),
    ColorChanged(Rgba<u8>),
    BrushSizeChanged(u32),
    HistoryChanged { can_undo: bool, can_redo: bool },
    ViewChanged { zoom: f32, pan: Vec2 },
    ImageReplaced { width: u32, height: u32 },
    ImageSaved { path: PathBuf, format: SaveFormat },
}

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&EditorEvent) + Send,
{
    fn handle_event(&mut self, event: &EditorEvent) {
        self(event)
    }
}

/// Broadcasts editor events to registered handlers in registration order.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.len()))
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn emit(&mut self, event: EditorEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn handlers_receive_events_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for id in 0..2 {
            let log = Arc::clone(&log);
            bus.subscribe(Box::new(move |e: &EditorEvent| {
                log.lock().unwrap().push((id, e.clone()));
            }));
        }
        bus.emit(EditorEvent::BrushSizeChanged(7));
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], (0, EditorEvent::BrushSizeChanged(7)));
        assert_eq!(log[1].0, 1);
    }

    #[test]
    fn emit_without_handlers_is_fine() {
        let mut bus = EventBus::default();
        bus.emit(EditorEvent::TextEntryRequested { position: Pos2::ZERO });
        assert_eq!(bus.handler_count(), 0);
    }
}
