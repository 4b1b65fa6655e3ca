use egui::{PointerButton, pos2};
use image::RgbaImage;
use paintcore::{DrawingMode, HistoryManager, InputEvent, PaintEditor, PaintSettings, RasterSurface, SnapshotCommand};

fn small_editor(depth: usize) -> PaintEditor {
    PaintEditor::new(PaintSettings {
        history_depth: depth,
        initial_width: 400,
        initial_height: 300,
        ..PaintSettings::default()
    })
}

/// One brush dot per call, each at a distinct spot so every step changes pixels.
fn dot(editor: &mut PaintEditor, i: usize) {
    let p = pos2(10.0 + (i % 30) as f32 * 12.0, 10.0 + (i / 30) as f32 * 12.0);
    editor.handle(InputEvent::PointerDown { pos: p, button: PointerButton::Primary }).unwrap();
    editor.handle(InputEvent::PointerUp { pos: p, button: PointerButton::Primary }).unwrap();
}

#[test]
fn undo_n_then_redo_n_is_byte_exact() {
    let mut editor = small_editor(20);
    let initial = editor.image().clone();
    let mut states: Vec<RgbaImage> = Vec::new();
    for i in 0..8 {
        dot(&mut editor, i);
        states.push(editor.image().clone());
    }

    for k in (0..8).rev() {
        assert!(editor.undo());
        let expected = if k == 0 { &initial } else { &states[k - 1] };
        assert_eq!(editor.image().as_raw(), expected.as_raw());
    }
    assert!(!editor.undo());

    for state in &states {
        assert!(editor.redo());
        assert_eq!(editor.image().as_raw(), state.as_raw());
    }
    assert!(!editor.redo());
}

#[test]
fn execute_after_undo_discards_redo() {
    let mut editor = small_editor(20);
    dot(&mut editor, 0);
    dot(&mut editor, 1);
    editor.undo();
    editor.undo();
    assert!(editor.can_redo());
    dot(&mut editor, 2);
    assert!(!editor.can_redo());
    assert_eq!(editor.history().redo_count(), 0);
    assert_eq!(editor.history().undo_count(), 1);
}

#[test]
fn capacity_plus_k_keeps_exactly_capacity() {
    let capacity = 20;
    let k = 5;
    let mut editor = small_editor(capacity);
    let mut states = Vec::new();
    for i in 0..capacity + k {
        dot(&mut editor, i);
        states.push(editor.image().clone());
    }
    assert_eq!(editor.history().undo_count(), capacity);

    let mut undone = 0;
    while editor.undo() {
        undone += 1;
    }
    assert_eq!(undone, capacity);
    // The oldest k steps cannot be undone: the buffer stops at step k
    assert_eq!(editor.image().as_raw(), states[k - 1].as_raw());
}

#[test]
fn undo_redo_on_empty_history_are_noops() {
    let mut editor = small_editor(20);
    let before = editor.image().clone();
    editor.handle(InputEvent::Undo).unwrap();
    editor.handle(InputEvent::Redo).unwrap();
    assert_eq!(editor.image().as_raw(), before.as_raw());
}

#[test]
fn no_op_gestures_are_not_recorded() {
    let mut editor = small_editor(20);
    editor.handle(InputEvent::ToolSelected(DrawingMode::Eraser)).unwrap();
    dot(&mut editor, 0);
    editor.handle(InputEvent::ToolSelected(DrawingMode::Line)).unwrap();
    let p = pos2(30.0, 30.0);
    editor.handle(InputEvent::PointerDown { pos: p, button: PointerButton::Primary }).unwrap();
    editor.handle(InputEvent::PointerUp { pos: pos2(-10.0, 30.0), button: PointerButton::Primary }).unwrap();
    assert!(!editor.can_undo());
}

#[test]
fn undo_does_not_reset_zoom() {
    let mut editor = small_editor(20);
    dot(&mut editor, 0);
    editor
        .handle(InputEvent::Wheel { pos: pos2(100.0, 100.0), delta: 3.0, modifiers: Default::default() })
        .unwrap();
    let zoom = editor.surface().zoom();
    editor.undo();
    assert_eq!(editor.surface().zoom(), zoom);
}

#[test]
fn snapshot_commands_own_independent_copies() {
    let mut surface = RasterSurface::new(400, 300);
    let mut history = HistoryManager::new(4);
    let before = surface.snapshot();
    let mut after = before.clone();
    after.put_pixel(3, 3, image::Rgba([9, 9, 9, 255]));

    history.execute(Box::new(SnapshotCommand::new("Poke", before.clone(), after.clone())), &mut surface);
    assert_eq!(surface.pixel(3, 3), Some(image::Rgba([9, 9, 9, 255])));

    // mutating our copies does not affect what history restores
    after.put_pixel(3, 3, image::Rgba([1, 1, 1, 255]));
    history.undo(&mut surface);
    assert!(surface.matches(&before));
    history.redo(&mut surface);
    assert_eq!(surface.pixel(3, 3), Some(image::Rgba([9, 9, 9, 255])));
}
