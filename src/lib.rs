//! PaintCore - a raster paint engine with whole-bitmap undo/redo.
//!
//! [`PaintEditor`] is the entry point: feed it [`InputEvent`]s from any
//! presentation layer and subscribe to [`EditorEvent`]s for feedback.

#[macro_use]
pub mod logger;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod events;
pub mod io;
pub mod ops;
pub mod script;
pub mod settings;

pub use app::PaintEditor;
pub use canvas::{RasterSurface, ViewTransform};
pub use components::history::{Command, HistoryManager, SnapshotCommand};
pub use components::tools::{DrawingMode, SessionOutput, ToolController};
pub use events::{EditorEvent, EventBus, EventHandler, InputEvent};
pub use io::{CanvasError, SaveFormat};
pub use settings::PaintSettings;
