use image::RgbaImage;
use std::collections::VecDeque;

use crate::canvas::RasterSurface;

/// Default number of undoable steps.
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

// ============================================================================
// COMMAND TRAIT
// ============================================================================

/// Trait for undoable/redoable commands.
pub trait Command: Send + Sync {
    fn undo(&self, surface: &mut RasterSurface);
    fn redo(&self, surface: &mut RasterSurface);
    fn description(&self) -> String;
    fn memory_size(&self) -> usize;
}

// ============================================================================
// SNAPSHOT COMMAND - whole-bitmap before/after pair
// ============================================================================

/// Stores complete before/after copies of the bitmap. Restoration is exact
/// regardless of how the change was produced (fills, text, strokes).
pub struct SnapshotCommand {
    description: String,
    before: RgbaImage,
    after: RgbaImage,
}

impl SnapshotCommand {
    pub fn new(description: impl Into<String>, before: RgbaImage, after: RgbaImage) -> Self {
        Self { description: description.into(), before, after }
    }

    pub fn before(&self) -> &RgbaImage {
        &self.before
    }

    pub fn after(&self) -> &RgbaImage {
        &self.after
    }
}

impl Command for SnapshotCommand {
    fn undo(&self, surface: &mut RasterSurface) {
        surface.restore_snapshot(&self.before);
    }

    fn redo(&self, surface: &mut RasterSurface) {
        surface.restore_snapshot(&self.after);
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn memory_size(&self) -> usize {
        self.before.as_raw().len() + self.after.as_raw().len()
    }
}

// ============================================================================
// HISTORY MANAGER - bounded undo/redo stacks
// ============================================================================

/// Undo/redo history. Both stacks keep the most recent command at the back.
pub struct HistoryManager {
    undo_stack: VecDeque<Box<dyn Command>>,
    redo_stack: VecDeque<Box<dyn Command>>,
    max_history_size: usize,
    /// Optional memory cap in bytes; off unless configured.
    max_memory_bytes: Option<usize>,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            max_memory_bytes: None,
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(mut self, max_bytes: Option<usize>) -> Self {
        self.max_memory_bytes = max_bytes;
        self.prune();
        self
    }

    pub fn capacity(&self) -> usize {
        self.max_history_size
    }

    /// Discard the redo stack, apply `command`'s forward action, and record it.
    pub fn execute(&mut self, command: Box<dyn Command>, surface: &mut RasterSurface) {
        for cmd in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(cmd.memory_size());
        }

        command.redo(surface);
        self.total_memory += command.memory_size();
        self.undo_stack.push_back(command);

        self.prune();
    }

    pub fn undo(&mut self, surface: &mut RasterSurface) -> Option<String> {
        let command = self.undo_stack.pop_back()?;
        let description = command.description();
        command.undo(surface);
        self.redo_stack.push_back(command);
        Some(description)
    }

    pub fn redo(&mut self, surface: &mut RasterSurface) -> Option<String> {
        let command = self.redo_stack.pop_back()?;
        let description = command.description();
        command.redo(surface);
        self.undo_stack.push_back(command);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|c| c.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.back().map(|c| c.description())
    }

    /// Get all undo descriptions (most recent first)
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|c| c.description()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    /// Evict the oldest undo entries beyond the count cap, then beyond the
    /// memory cap (always keeping the newest entry).
    fn prune(&mut self) {
        let mut evicted = 0usize;
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                evicted += 1;
            }
        }

        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            crate::log_info!("History: evicted {} oldest step(s), {} bytes held", evicted, self.total_memory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::strokes::Ink;
    use egui::pos2;
    use image::Rgba;

    fn paint_step(surface: &mut RasterSurface, history: &mut HistoryManager, i: u32) {
        let before = surface.snapshot();
        surface.draw_point(pos2(10.0 + i as f32 * 4.0, 10.0), Ink::Color(Rgba([0, 0, 0, 255])), 1.0);
        let after = surface.snapshot();
        surface.restore_snapshot(&before);
        history.execute(Box::new(SnapshotCommand::new(format!("Step {i}"), before, after)), surface);
    }

    #[test]
    fn execute_applies_forward_action() {
        let mut surface = RasterSurface::new(400, 300);
        let mut history = HistoryManager::new(5);
        paint_step(&mut surface, &mut history, 0);
        assert_eq!(surface.pixel(10, 10), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(history.undo_description().as_deref(), Some("Step 0"));
    }

    #[test]
    fn empty_stacks_are_noops() {
        let mut surface = RasterSurface::new(400, 300);
        let mut history = HistoryManager::default();
        assert_eq!(history.undo(&mut surface), None);
        assert_eq!(history.redo(&mut surface), None);
        assert!(!history.can_undo() && !history.can_redo());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut surface = RasterSurface::new(400, 300);
        let mut history = HistoryManager::new(3);
        for i in 0..5 {
            paint_step(&mut surface, &mut history, i);
        }
        assert_eq!(history.undo_count(), 3);
        assert_eq!(history.undo_history(), vec!["Step 4", "Step 3", "Step 2"]);
        while history.undo(&mut surface).is_some() {}
        // steps 0 and 1 are unrecoverable
        assert_eq!(surface.pixel(10, 10), Some(Rgba([0, 0, 0, 255])));
        assert_eq!(surface.pixel(18, 10), Some(Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn memory_accounting_tracks_both_stacks() {
        let mut surface = RasterSurface::new(400, 300);
        let mut history = HistoryManager::new(10);
        paint_step(&mut surface, &mut history, 0);
        paint_step(&mut surface, &mut history, 1);
        let per_step = 2 * 400 * 300 * 4;
        assert_eq!(history.memory_usage(), 2 * per_step);
        history.undo(&mut surface);
        assert_eq!(history.memory_usage(), 2 * per_step);
        paint_step(&mut surface, &mut history, 2);
        assert_eq!(history.memory_usage(), 2 * per_step);
        history.clear();
        assert_eq!(history.memory_usage(), 0);
    }

    #[test]
    fn memory_limit_keeps_newest_entry() {
        let mut surface = RasterSurface::new(400, 300);
        let mut history = HistoryManager::new(10).with_memory_limit(Some(1));
        paint_step(&mut surface, &mut history, 0);
        paint_step(&mut surface, &mut history, 1);
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_description().as_deref(), Some("Step 1"));
    }
}
