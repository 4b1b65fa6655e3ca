// ============================================================================
// ACTION SCRIPTS - line-oriented editor input for batch runs
// ============================================================================
//
//   # comment
//   viewport 1024 768
//   tool rectangle
//   color #ff0000
//   size 5
//   drag 10 10 50 40
//   text Hello\nWorld
//   save out.png png
//
// Coordinates are view coordinates, exactly as a pointer would report them.

use std::fmt;
use std::path::PathBuf;

use egui::{Modifiers, PointerButton, pos2, vec2};

use crate::app::PaintEditor;
use crate::components::tools::DrawingMode;
use crate::events::InputEvent;
use crate::io::SaveFormat;
use crate::settings::parse_hex_color;

/// A parse or execution failure, tagged with its 1-based script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// One input event and the script line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptAction {
    pub line: usize,
    pub event: InputEvent,
}

/// Parse a whole script. Stops at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<ScriptAction>, ScriptError> {
    let mut actions = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let events = parse_line(trimmed).map_err(|message| ScriptError { line, message })?;
        actions.extend(events.into_iter().map(|event| ScriptAction { line, event }));
    }
    Ok(actions)
}

/// Feed parsed actions to the editor in order.
pub fn run_actions(editor: &mut PaintEditor, actions: Vec<ScriptAction>) -> Result<(), ScriptError> {
    for action in actions {
        let line = action.line;
        editor
            .handle(action.event)
            .map_err(|e| ScriptError { line, message: e.to_string() })?;
    }
    Ok(())
}

fn parse_line(line: &str) -> Result<Vec<InputEvent>, String> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();
    let primary = PointerButton::Primary;

    let events = match command.to_ascii_lowercase().as_str() {
        "tool" => {
            let name = expect_text(rest, "tool name")?;
            let mode = DrawingMode::from_name(name).ok_or_else(|| format!("unknown tool '{}'", name))?;
            vec![InputEvent::ToolSelected(mode)]
        }
        "color" | "colour" => {
            let text = expect_text(rest, "color")?;
            let color = parse_hex_color(text).ok_or_else(|| format!("invalid color '{}'", text))?;
            vec![InputEvent::ColorChanged(color)]
        }
        "size" => {
            let [n] = numbers::<1>(&args)?;
            vec![InputEvent::BrushSizeChanged(n.round() as i32)]
        }
        "down" => {
            let [x, y] = numbers::<2>(&args)?;
            vec![InputEvent::PointerDown { pos: pos2(x, y), button: primary }]
        }
        "move" => {
            let [x, y] = numbers::<2>(&args)?;
            vec![InputEvent::PointerMove { pos: pos2(x, y), primary_down: true }]
        }
        "hover" => {
            let [x, y] = numbers::<2>(&args)?;
            vec![InputEvent::PointerMove { pos: pos2(x, y), primary_down: false }]
        }
        "up" => {
            let [x, y] = numbers::<2>(&args)?;
            vec![InputEvent::PointerUp { pos: pos2(x, y), button: primary }]
        }
        "click" => {
            let [x, y] = numbers::<2>(&args)?;
            let pos = pos2(x, y);
            vec![
                InputEvent::PointerDown { pos, button: primary },
                InputEvent::PointerUp { pos, button: primary },
            ]
        }
        "drag" => {
            let [x0, y0, x1, y1] = numbers::<4>(&args)?;
            let end = pos2(x1, y1);
            vec![
                InputEvent::PointerDown { pos: pos2(x0, y0), button: primary },
                InputEvent::PointerMove { pos: end, primary_down: true },
                InputEvent::PointerUp { pos: end, button: primary },
            ]
        }
        "text" => vec![InputEvent::TextProvided(rest.replace("\\n", "\n"))],
        "cancel" => vec![InputEvent::TextCancelled],
        "undo" => vec![InputEvent::Undo],
        "redo" => vec![InputEvent::Redo],
        "clear" => vec![InputEvent::ClearRequested],
        "zoom" => {
            let [x, y, steps] = numbers::<3>(&args)?;
            vec![InputEvent::Wheel { pos: pos2(x, y), delta: steps, modifiers: Modifiers::NONE }]
        }
        "pan" => {
            let [dx, dy] = numbers::<2>(&args)?;
            vec![InputEvent::Pan { delta: vec2(dx, dy) }]
        }
        "viewport" => {
            let [w, h] = numbers::<2>(&args)?;
            if w < 0.0 || h < 0.0 {
                return Err("viewport size must not be negative".to_string());
            }
            vec![InputEvent::ViewportResized(vec2(w, h))]
        }
        "save" => {
            let text = expect_text(rest, "path")?;
            let (path, format) = match text.rsplit_once(char::is_whitespace) {
                Some((path, fmt)) if SaveFormat::from_name(fmt).is_some() => {
                    (path.trim(), SaveFormat::from_name(fmt))
                }
                _ => (text, None),
            };
            vec![InputEvent::SaveRequested { path: PathBuf::from(path), format }]
        }
        "open" => vec![InputEvent::OpenRequested(PathBuf::from(expect_text(rest, "path")?))],
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(events)
}

fn expect_text<'a>(rest: &'a str, what: &str) -> Result<&'a str, String> {
    if rest.is_empty() {
        Err(format!("missing {}", what))
    } else {
        Ok(rest)
    }
}

/// Exactly `N` finite numeric arguments.
fn numbers<const N: usize>(args: &[&str]) -> Result<[f32; N], String> {
    if args.len() != N {
        return Err(format!("expected {} number(s), got {}", N, args.len()));
    }
    let mut out = [0.0f32; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a number", arg))?;
    }
    Ok(out)
}
