//! View adapter
//!
//! The only code that talks to a [`RenderSurface`]. Pointer input comes in
//! through the `on_*` methods and is turned into engine calls; engine
//! notifications go back out as draw and animation calls.

use gear_event::EventChannel;
use gear_grid::{Cell, GridLayout, Occupant};

use crate::equipment::SlotName;
use crate::item::{ItemEntity, Position};
use crate::transfer::{
    Crossing, DropTarget, GestureState, ResizeReport, TransferEngine, TransferError,
    TransferEvent, TransferOutcome, TransferResult,
};

/// Something that can draw the inventory
pub trait RenderSurface {
    /// Remove everything drawn so far
    fn clear(&mut self);

    /// Draw grid lines for a rows × cols grid
    fn draw_grid(&mut self, rows: usize, cols: usize, cell_size: f32);

    /// Draw a blocked cell
    fn draw_reserved(&mut self, cell: Cell);

    /// Draw an equipment slot with its occupant
    fn draw_slot(&mut self, slot: SlotName, occupant: Option<&str>);

    /// Draw an item at its current position
    fn draw_item(&mut self, item: &ItemEntity);

    /// Move an already drawn item to a new position
    fn animate_to(&mut self, item: &str, to: Position);
}

/// A recorded draw call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Clear,
    Grid { rows: usize, cols: usize },
    Reserved(Cell),
    Slot(SlotName, Option<String>),
    Item { name: String, at: Position, colour: &'static str },
    Animate { item: String, to: Position },
}

/// Surface that keeps its draw calls, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the recorded calls
    pub fn take(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn draw_grid(&mut self, rows: usize, cols: usize, _cell_size: f32) {
        self.calls.push(DrawCall::Grid { rows, cols });
    }

    fn draw_reserved(&mut self, cell: Cell) {
        self.calls.push(DrawCall::Reserved(cell));
    }

    fn draw_slot(&mut self, slot: SlotName, occupant: Option<&str>) {
        self.calls
            .push(DrawCall::Slot(slot, occupant.map(str::to_string)));
    }

    fn draw_item(&mut self, item: &ItemEntity) {
        self.calls.push(DrawCall::Item {
            name: item.name.clone(),
            at: item.current_position,
            colour: item.rarity.colour(),
        });
    }

    fn animate_to(&mut self, item: &str, to: Position) {
        self.calls.push(DrawCall::Animate {
            item: item.to_string(),
            to,
        });
    }
}

/// Pixel sizes used to map pointer positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMetrics {
    /// Width and height of one grid cell
    pub cell_size: f32,
    /// Height of the character panel above the inventory
    pub panel_height: f32,
}

impl Default for ViewMetrics {
    fn default() -> Self {
        Self {
            cell_size: 75.0,
            panel_height: 300.0,
        }
    }
}

/// Connects a [`TransferEngine`] to a [`RenderSurface`]
pub struct ViewAdapter<S: RenderSurface> {
    engine: TransferEngine,
    surface: S,
    notifications: EventChannel<TransferEvent>,
    metrics: ViewMetrics,
    /// Whether the dragged item is currently outside its origin panel
    outside: bool,
}

impl<S: RenderSurface> ViewAdapter<S> {
    pub fn new(mut engine: TransferEngine, surface: S, metrics: ViewMetrics) -> Self {
        let notifications = engine.events_mut().forward::<TransferEvent>();
        Self {
            engine,
            surface,
            notifications,
            metrics,
            outside: false,
        }
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn metrics(&self) -> ViewMetrics {
        self.metrics
    }

    /// Draw everything from scratch
    pub fn redraw(&mut self) {
        let grid = self.engine.grid();

        self.surface.clear();
        self.surface
            .draw_grid(grid.rows(), grid.cols(), self.metrics.cell_size);
        for (cell, occupant) in grid.cells() {
            if matches!(occupant, Occupant::Reserved) {
                self.surface.draw_reserved(cell);
            }
        }
        for (slot, occupant) in self.engine.slots().iter() {
            self.surface.draw_slot(slot, occupant);
        }
        for item in self.engine.items() {
            if item.current_position != Position::Unplaced {
                self.surface.draw_item(item);
            }
        }
    }

    /// Snap a grid-relative pixel position to a cell
    pub fn cell_at(&self, x: f32, y: f32) -> Option<Cell> {
        let col = (x / self.metrics.cell_size).round();
        let row = (y / self.metrics.cell_size).round();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        Some(Cell::new(row as usize, col as usize))
    }

    /// Drop target for a grid-relative pixel position
    pub fn grid_target(&self, x: f32, y: f32) -> DropTarget {
        self.cell_at(x, y)
            .map(DropTarget::Cell)
            .unwrap_or(DropTarget::Outside)
    }

    pub fn on_drag_start(&mut self, name: &str) -> TransferResult<()> {
        self.engine.begin_drag(name)?;
        self.outside = false;
        Ok(())
    }

    /// Track pointer motion relative to the origin panel.
    ///
    /// Grid items leave upward once the snapped row goes negative; slot items
    /// leave downward past the character panel.
    pub fn on_drag_move(&mut self, name: &str, _x: f32, y: f32) -> TransferResult<()> {
        let origin = match self.engine.gesture() {
            GestureState::Dragging(gesture) if gesture.item == name => gesture.origin,
            _ => return Err(TransferError::NoActiveGesture(name.to_string())),
        };

        let (outside, leaving) = match origin {
            Position::Slot(_) => (y > self.metrics.panel_height, Crossing::TowardInventory),
            _ => (
                (y / self.metrics.cell_size).round() < 0.0,
                Crossing::TowardEquipment,
            ),
        };

        if outside != self.outside {
            self.outside = outside;
            let crossing = if outside { leaving } else { opposite(leaving) };
            self.on_boundary_crossing(name, crossing)?;
        }
        Ok(())
    }

    pub fn on_boundary_crossing(&mut self, name: &str, crossing: Crossing) -> TransferResult<()> {
        self.engine.cross_boundary(name, crossing)
    }

    pub fn on_drag_end(&mut self, name: &str, target: DropTarget) -> TransferResult<TransferOutcome> {
        self.outside = false;
        let outcome = self.engine.end_drag(name, target)?;
        self.settle(name, &outcome);
        Ok(outcome)
    }

    /// Abandon the drag in flight, if any
    pub fn on_drag_cancel(&mut self) -> Option<String> {
        self.outside = false;
        let item = self.engine.cancel_gesture();
        self.sync_notifications();
        item
    }

    pub fn on_double_activate(&mut self, name: &str) -> TransferResult<TransferOutcome> {
        let outcome = self.engine.toggle_equip(name)?;
        self.settle(name, &outcome);
        Ok(outcome)
    }

    /// Reshape the grid and draw it again
    pub fn on_resize(&mut self, layout: GridLayout) -> TransferResult<ResizeReport> {
        self.outside = false;
        let report = self.engine.resize(layout)?;
        self.notifications.drain();
        self.redraw();
        Ok(report)
    }

    /// Turn pending notifications into animations
    pub fn sync_notifications(&mut self) -> usize {
        let events = self.notifications.drain();
        for event in &events {
            match event {
                TransferEvent::ItemMoved { item, cell }
                | TransferEvent::ItemUnequipped { item, cell } => {
                    self.surface.animate_to(item, Position::Cell(*cell));
                }
                TransferEvent::ItemEquipped { item, slot } => {
                    self.surface.animate_to(item, Position::Slot(*slot));
                }
                TransferEvent::GestureRejected { item, return_to } => {
                    self.surface.animate_to(item, *return_to);
                }
            }
        }
        events.len()
    }

    fn settle(&mut self, name: &str, outcome: &TransferOutcome) {
        self.sync_notifications();
        // A dropped item that did not move still has to snap back
        if *outcome == TransferOutcome::Noop {
            if let Some(position) = self.engine.locate(name) {
                self.surface.animate_to(name, position);
            }
        }
    }
}

fn opposite(crossing: Crossing) -> Crossing {
    match crossing {
        Crossing::TowardEquipment => Crossing::TowardInventory,
        Crossing::TowardInventory => Crossing::TowardEquipment,
    }
}
