//! Text render surface
//!
//! Keeps a picture of what would be on screen and reports animations as
//! lines of text.

use std::collections::{BTreeMap, BTreeSet};

use gear_grid::Cell;
use gear_inventory::{ItemEntity, Position, RenderSurface, SlotName};

/// Width of one drawn cell
const CELL_WIDTH: usize = 10;

#[derive(Debug, Default)]
pub struct TextSurface {
    rows: usize,
    cols: usize,
    cells: BTreeMap<Cell, String>,
    blocked: BTreeSet<Cell>,
    slots: BTreeMap<SlotName, Option<String>>,
    messages: Vec<String>,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animation messages since the last call
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    /// Draw the current picture
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let slots: Vec<String> = self
            .slots
            .iter()
            .map(|(slot, item)| format!("{}: {}", slot, item.as_deref().unwrap_or("-")))
            .collect();
        lines.push(slots.join("  "));

        let border = format!("+{}", format!("{}+", "-".repeat(CELL_WIDTH)).repeat(self.cols));
        lines.push(border.clone());
        for row in 0..self.rows {
            let mut line = String::from("|");
            for col in 0..self.cols {
                let cell = Cell::new(row, col);
                let label = if self.blocked.contains(&cell) {
                    "#".repeat(CELL_WIDTH)
                } else {
                    let name = self.cells.get(&cell).map(String::as_str).unwrap_or("");
                    format!("{:^width$}", truncate(name, CELL_WIDTH), width = CELL_WIDTH)
                };
                line.push_str(&label);
                line.push('|');
            }
            lines.push(line);
            lines.push(border.clone());
        }

        lines
    }

    fn remove(&mut self, item: &str) {
        self.cells.retain(|_, name| name != item);
        for occupant in self.slots.values_mut() {
            if occupant.as_deref() == Some(item) {
                *occupant = None;
            }
        }
    }

    fn put(&mut self, item: &str, at: Position) {
        match at {
            Position::Cell(cell) => {
                self.cells.insert(cell, item.to_string());
            }
            Position::Slot(slot) => {
                self.slots.insert(slot, Some(item.to_string()));
            }
            Position::Unplaced => {}
        }
    }
}

impl RenderSurface for TextSurface {
    fn clear(&mut self) {
        self.cells.clear();
        self.blocked.clear();
        self.slots.clear();
    }

    fn draw_grid(&mut self, rows: usize, cols: usize, _cell_size: f32) {
        self.rows = rows;
        self.cols = cols;
    }

    fn draw_reserved(&mut self, cell: Cell) {
        self.blocked.insert(cell);
    }

    fn draw_slot(&mut self, slot: SlotName, occupant: Option<&str>) {
        self.slots.insert(slot, occupant.map(str::to_string));
    }

    fn draw_item(&mut self, item: &ItemEntity) {
        self.put(&item.name, item.current_position);
    }

    fn animate_to(&mut self, item: &str, to: Position) {
        self.remove(item);
        self.put(item, to);
        self.messages.push(format!("{} -> {}", item, to));
    }
}

fn truncate(name: &str, width: usize) -> String {
    name.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_grid() {
        let mut surface = TextSurface::new();
        surface.draw_grid(2, 2, 75.0);
        surface.draw_reserved(Cell::new(1, 1));
        surface.draw_slot(SlotName::Head, Some("cap"));
        surface.animate_to("sword", Position::Cell(Cell::new(0, 1)));

        let lines = surface.render();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("head: cap"));
        assert!(lines[2].contains("sword"));
        assert!(lines[4].contains("##########"));
        assert_eq!(surface.take_messages(), vec!["sword -> cell (0, 1)"]);
    }

    #[test]
    fn test_animation_moves_item() {
        let mut surface = TextSurface::new();
        surface.draw_grid(1, 2, 75.0);
        surface.draw_slot(SlotName::MainHand, None);
        surface.animate_to("sword", Position::Cell(Cell::new(0, 0)));
        surface.animate_to("sword", Position::Slot(SlotName::MainHand));

        let lines = surface.render();
        assert!(lines[0].contains("main_hand: sword"));
        assert!(!lines[2].contains("sword"));
    }
}
