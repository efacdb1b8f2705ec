//! Transfer engine
//!
//! Owns the grid, the slots and every item, and is the only thing that
//! mutates them. Each committed change is applied locally in full, then
//! handed to the sink as one batch, then announced on the event bus.
//!
//! Gestures run `Idle -> Dragging -> {Committing, RollingBack} -> Idle`.
//! Direct calls (`move_within_grid`, `equip`, ...) skip `Dragging` and are
//! refused while a drag is in flight.

use std::collections::BTreeMap;

use gear_event::{EventBus, Priority};
use gear_grid::{Cell, GridAllocator, GridError, GridLayout, Occupant};
use gear_sync::{BatchSink, PersistRecord};
use thiserror::Error;

use crate::equipment::{EquipError, SlotName, SlotSet};
use crate::item::{ItemEntity, Position};

/// Structural errors. These indicate a caller or data bug and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Equip(#[from] EquipError),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Item loaded twice: {0}")]
    DuplicateItem(String),

    #[error("A drag of {0} is already in progress")]
    GestureInProgress(String),

    #[error("No drag in progress for {0}")]
    NoActiveGesture(String),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// Why a gesture was sent back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Target is reserved padding
    BlockedCell(Cell),
    /// Target is not part of the current shape
    OutsideGrid(Cell),
    /// Slot does not take this item
    SlotTypeMismatch(SlotName),
    /// Occupant of the target cell cannot go into the vacated slot
    SwapTypeMismatch { occupant: String, slot: SlotName },
    /// Occupant has a different footprint
    FootprintMismatch { occupant: String },
    /// Dropped in the other container without crossing into it
    NotSelected,
    /// Dropped on nothing
    NoTarget,
    /// No free cell for an item leaving a slot
    InventoryFull,
}

/// Result of a gesture or direct operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Nothing changed
    Noop,
    /// Applied locally and submitted as one batch
    Committed(Vec<PersistRecord>),
    /// Nothing changed and the item goes back where it was
    Rejected(Rejection),
}

impl TransferOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Outbound notifications for whatever draws the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    ItemMoved { item: String, cell: Cell },
    ItemEquipped { item: String, slot: SlotName },
    ItemUnequipped { item: String, cell: Cell },
    GestureRejected { item: String, return_to: Position },
}

/// Which way a drag crossed between the inventory and equipment panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    TowardEquipment,
    TowardInventory,
}

/// Where a drag ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    Cell(Cell),
    Slot(SlotName),
    Outside,
}

/// An in-flight drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gesture {
    pub item: String,
    /// Position when the drag began
    pub origin: Position,
    /// Item has crossed out of its origin container
    pub selected: bool,
}

/// Gesture state
///
/// `Committing` and `RollingBack` are transient: they are held only while
/// the engine hands a commit to the sink or publishes a rollback, and the
/// engine is back to `Idle` before any call returns. Callers only ever see
/// `Idle` or `Dragging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Dragging(Gesture),
    Committing,
    RollingBack,
}

/// Summary of a resize
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResizeReport {
    /// Items that lost their index and were given a free cell
    pub replaced: Vec<String>,
    /// Items that lost their index and found no free cell
    pub overflow: Vec<String>,
}

/// Grid, slots and items, plus the drag state machine
pub struct TransferEngine {
    pub(crate) layout: GridLayout,
    pub(crate) grid: GridAllocator,
    pub(crate) slots: SlotSet,
    pub(crate) items: BTreeMap<String, ItemEntity>,
    gesture: GestureState,
    events: EventBus,
    pub(crate) sink: Box<dyn BatchSink>,
}

impl TransferEngine {
    /// Create an empty engine for a layout
    pub fn new(layout: GridLayout, sink: Box<dyn BatchSink>) -> TransferResult<Self> {
        let grid = layout.build()?;
        log::info!(
            "Inventory of {} at {}x{} ({})",
            layout.size,
            grid.rows(),
            grid.cols(),
            layout.orientation
        );

        Ok(Self {
            layout,
            grid,
            slots: SlotSet::new(),
            items: BTreeMap::new(),
            gesture: GestureState::Idle,
            events: EventBus::new(),
            sink,
        })
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn grid(&self) -> &GridAllocator {
        &self.grid
    }

    pub fn slots(&self) -> &SlotSet {
        &self.slots
    }

    /// Look up an item
    pub fn item(&self, name: &str) -> Option<&ItemEntity> {
        self.items.get(name)
    }

    /// All items, by name
    pub fn items(&self) -> impl Iterator<Item = &ItemEntity> {
        self.items.values()
    }

    /// Where an item currently is
    pub fn locate(&self, name: &str) -> Option<Position> {
        self.items.get(name).map(|item| item.current_position)
    }

    /// Index of an item's cell, `None` when equipped or unplaced
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.locate(name)
            .and_then(|p| p.cell())
            .and_then(|cell| self.grid.cell_to_index(cell))
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    /// Event bus carrying [`TransferEvent`]s
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // ------------------------------------------------------------------
    // Direct operations
    // ------------------------------------------------------------------

    /// Move an item to a grid cell, swapping with an item already there
    pub fn move_within_grid(&mut self, name: &str, target: Cell) -> TransferResult<TransferOutcome> {
        self.ensure_idle()?;
        let outcome = self.apply_move(name, target)?;
        Ok(self.finish(name, outcome))
    }

    /// Put an item in its slot, sending any current occupant to the grid
    pub fn equip(&mut self, name: &str, slot: SlotName) -> TransferResult<TransferOutcome> {
        self.ensure_idle()?;
        let outcome = self.apply_equip(name, slot)?;
        Ok(self.finish(name, outcome))
    }

    /// Take an item out of its slot into a grid cell
    pub fn unequip(&mut self, name: &str, target: Cell) -> TransferResult<TransferOutcome> {
        self.ensure_idle()?;
        let outcome = self.apply_unequip(name, target)?;
        Ok(self.finish(name, outcome))
    }

    /// Double-activation shortcut.
    ///
    /// Equips into the item's slot, or unequips to the first free cell.
    /// An equipped item stays put when the grid is full.
    pub fn toggle_equip(&mut self, name: &str) -> TransferResult<TransferOutcome> {
        self.ensure_idle()?;
        let item = self.entity(name)?;

        let outcome = match (item.current_position, item.required_slot) {
            (Position::Slot(_), _) => match self.grid.next_free_cell() {
                Some(cell) => self.apply_unequip(name, cell)?,
                None => {
                    log::info!("No free cell to unequip {}", name);
                    TransferOutcome::Noop
                }
            },
            (_, Some(slot)) => self.apply_equip(name, slot)?,
            (_, None) => {
                log::debug!("{} has no slot, nothing to toggle", name);
                TransferOutcome::Noop
            }
        };

        Ok(self.finish(name, outcome))
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Start dragging an item
    pub fn begin_drag(&mut self, name: &str) -> TransferResult<()> {
        if let GestureState::Dragging(gesture) = &self.gesture {
            return Err(TransferError::GestureInProgress(gesture.item.clone()));
        }
        let origin = self.entity(name)?.current_position;

        log::debug!("Drag {} from {}", name, origin);
        self.gesture = GestureState::Dragging(Gesture {
            item: name.to_string(),
            origin,
            selected: false,
        });
        Ok(())
    }

    /// Record the dragged item crossing between panels.
    ///
    /// Leaving the origin container selects the item for transfer; coming
    /// back clears the selection.
    pub fn cross_boundary(&mut self, name: &str, crossing: Crossing) -> TransferResult<()> {
        let gesture = match &mut self.gesture {
            GestureState::Dragging(gesture) if gesture.item == name => gesture,
            _ => return Err(TransferError::NoActiveGesture(name.to_string())),
        };

        gesture.selected = match (gesture.origin, crossing) {
            (Position::Cell(_), Crossing::TowardEquipment) => true,
            (Position::Slot(_), Crossing::TowardInventory) => true,
            _ => false,
        };
        log::debug!("{} crossed {:?}, selected = {}", name, crossing, gesture.selected);
        Ok(())
    }

    /// Finish a drag over a target
    pub fn end_drag(&mut self, name: &str, target: DropTarget) -> TransferResult<TransferOutcome> {
        let gesture = match std::mem::replace(&mut self.gesture, GestureState::Idle) {
            GestureState::Dragging(gesture) if gesture.item == name => gesture,
            other => {
                self.gesture = other;
                return Err(TransferError::NoActiveGesture(name.to_string()));
            }
        };

        let outcome = match (gesture.origin, target) {
            (_, DropTarget::Outside) => TransferOutcome::Rejected(Rejection::NoTarget),

            (Position::Slot(_), DropTarget::Cell(cell)) => {
                if gesture.selected {
                    self.apply_unequip(name, cell)?
                } else {
                    TransferOutcome::Rejected(Rejection::NotSelected)
                }
            }
            (_, DropTarget::Cell(cell)) => self.apply_move(name, cell)?,

            (Position::Slot(from), DropTarget::Slot(slot)) if from == slot => TransferOutcome::Noop,
            (Position::Slot(_), DropTarget::Slot(slot)) => {
                TransferOutcome::Rejected(Rejection::SlotTypeMismatch(slot))
            }
            (_, DropTarget::Slot(slot)) => {
                if !gesture.selected {
                    TransferOutcome::Rejected(Rejection::NotSelected)
                } else if !self.entity(name)?.fits(slot) {
                    TransferOutcome::Rejected(Rejection::SlotTypeMismatch(slot))
                } else {
                    self.apply_equip(name, slot)?
                }
            }
        };

        Ok(self.finish(name, outcome))
    }

    /// Abandon any drag in flight, sending the item back
    pub fn cancel_gesture(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.gesture, GestureState::Idle) {
            GestureState::Dragging(gesture) => {
                log::debug!("Cancelled drag of {}", gesture.item);
                self.finish(&gesture.item, TransferOutcome::Rejected(Rejection::NoTarget));
                Some(gesture.item)
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Resize
    // ------------------------------------------------------------------

    /// Change the grid shape, keeping every item at its index.
    ///
    /// Items whose index no longer exists are given the first free cell,
    /// one batch each. Items that find no free cell become unplaced.
    pub fn resize(&mut self, layout: GridLayout) -> TransferResult<ResizeReport> {
        let (rows, cols) = layout.shape();
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidShape { rows, cols }.into());
        }
        self.cancel_gesture();

        let old_cols = self.grid.cols();
        let old_index: BTreeMap<String, usize> = self
            .grid
            .cells()
            .filter_map(|(cell, occupant)| {
                let index = self.grid.cell_to_index(cell)?;
                occupant.item().map(|name| (name.to_string(), index))
            })
            .collect();
        let mut displaced = self.grid.remap(rows, cols)?;

        // Padding moves with the shape, so drop the old markers first
        let reserved: Vec<Cell> = self
            .grid
            .cells()
            .filter(|(_, occupant)| matches!(occupant, Occupant::Reserved))
            .map(|(cell, _)| cell)
            .collect();
        for cell in reserved {
            self.grid.vacate(cell);
        }
        for cell in layout.padding_cells() {
            if let Some(name) = self.grid.occupant(cell).and_then(Occupant::item) {
                displaced.push(name.to_string());
                self.grid.vacate(cell);
            }
        }
        layout.reserve_padding(&mut self.grid);
        self.layout = layout;

        // Cells are ephemeral, so rewrite every grid position through its index
        for item in self.items.values_mut() {
            item.current_position = reindex(item.current_position, old_cols, &self.grid);
            item.last_position = reindex(item.last_position, old_cols, &self.grid);
        }
        for (cell, occupant) in self.grid.cells() {
            if let Some(item) = occupant.item().and_then(|name| self.items.get_mut(name)) {
                item.current_position = Position::Cell(cell);
            }
        }

        log::info!("Resized inventory to {}x{} ({})", rows, cols, layout.orientation);

        let mut report = ResizeReport::default();
        for name in displaced {
            let Some(cell) = self.grid.next_free_cell() else {
                log::warn!("No inventory space for {}", name);
                // Its old index is padding now or gone, so it leaves the grid
                if let Some(item) = self.items.get_mut(&name) {
                    item.move_to(Position::Unplaced);
                }
                self.sink.submit(vec![PersistRecord::moved(
                    name.as_str(),
                    old_index.get(&name).copied(),
                    None,
                )]);
                report.overflow.push(name);
                continue;
            };

            self.grid.occupy(cell, name.as_str());
            let index = self.grid.cell_to_index(cell);
            if let Some(item) = self.items.get_mut(&name) {
                item.current_position = Position::Unplaced;
                item.move_to(Position::Cell(cell));
            }
            self.sink.submit(vec![PersistRecord::moved(
                name.as_str(),
                old_index.get(&name).copied(),
                index,
            )]);
            self.events.publish(TransferEvent::ItemMoved {
                item: name.clone(),
                cell,
            });
            report.replaced.push(name);
        }
        self.events.process();

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn ensure_idle(&self) -> TransferResult<()> {
        match &self.gesture {
            GestureState::Dragging(gesture) => {
                Err(TransferError::GestureInProgress(gesture.item.clone()))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn entity(&self, name: &str) -> TransferResult<&ItemEntity> {
        self.items
            .get(name)
            .ok_or_else(|| TransferError::UnknownItem(name.to_string()))
    }

    fn entity_mut(&mut self, name: &str) -> TransferResult<&mut ItemEntity> {
        self.items
            .get_mut(name)
            .ok_or_else(|| TransferError::UnknownItem(name.to_string()))
    }

    fn apply_move(&mut self, name: &str, target: Cell) -> TransferResult<TransferOutcome> {
        let item = self.entity(name)?;
        let footprint = item.footprint;
        let position = item.current_position;
        let from = match position {
            Position::Slot(_) => return self.apply_unequip(name, target),
            Position::Cell(cell) => Some(cell),
            Position::Unplaced => None,
        };

        if from == Some(target) {
            return Ok(TransferOutcome::Noop);
        }

        let occupant = match self.grid.occupant(target) {
            Some(occupant) => occupant.clone(),
            None => return Ok(TransferOutcome::Rejected(Rejection::OutsideGrid(target))),
        };
        let from_index = from.and_then(|cell| self.grid.cell_to_index(cell));
        let to_index = self.grid.cell_to_index(target);

        match occupant {
            Occupant::Empty => {
                if let Some(cell) = from {
                    self.grid.vacate(cell);
                }
                self.grid.occupy(target, name);
                self.entity_mut(name)?.move_to(Position::Cell(target));
                self.events.publish(TransferEvent::ItemMoved {
                    item: name.to_string(),
                    cell: target,
                });

                Ok(TransferOutcome::Committed(vec![PersistRecord::moved(
                    name, from_index, to_index,
                )]))
            }
            Occupant::Item(other) => {
                let Some(from) = from else {
                    return Ok(TransferOutcome::Rejected(Rejection::InventoryFull));
                };
                if self.entity(&other)?.footprint != footprint {
                    return Ok(TransferOutcome::Rejected(Rejection::FootprintMismatch {
                        occupant: other,
                    }));
                }

                self.grid.occupy(from, other.as_str());
                self.grid.occupy(target, name);
                self.entity_mut(&other)?.move_to(Position::Cell(from));
                self.entity_mut(name)?.move_to(Position::Cell(target));

                self.events.publish(TransferEvent::ItemMoved {
                    item: name.to_string(),
                    cell: target,
                });
                self.events.publish(TransferEvent::ItemMoved {
                    item: other.clone(),
                    cell: from,
                });

                Ok(TransferOutcome::Committed(vec![
                    PersistRecord::moved(name, from_index, to_index),
                    PersistRecord::moved(other, to_index, from_index),
                ]))
            }
            Occupant::Reserved => Ok(TransferOutcome::Rejected(Rejection::BlockedCell(target))),
        }
    }

    fn apply_equip(&mut self, name: &str, slot: SlotName) -> TransferResult<TransferOutcome> {
        let item = self.entity(name)?;
        if !item.fits(slot) {
            return Err(EquipError::SlotTypeMismatch {
                item: name.to_string(),
                slot,
            }
            .into());
        }
        if item.current_position == Position::Slot(slot) {
            return Ok(TransferOutcome::Noop);
        }
        let from = item.current_position.cell();
        let from_index = from.and_then(|cell| self.grid.cell_to_index(cell));

        // The displaced occupant takes the cell being vacated, else the first free one
        let evicted = match self.slots.get(slot) {
            Some(occupant) => {
                let Some(cell) = from.or_else(|| self.grid.next_free_cell()) else {
                    return Ok(TransferOutcome::Rejected(Rejection::InventoryFull));
                };
                Some((occupant.to_string(), cell))
            }
            None => None,
        };

        if let Some(cell) = from {
            self.grid.vacate(cell);
        }

        let mut records = vec![PersistRecord::equip_change(name, true, from_index, None)];
        let mut unequipped = None;
        if let Some((occupant, cell)) = evicted {
            self.slots.evict(slot);
            self.grid.occupy(cell, occupant.as_str());
            self.entity_mut(&occupant)?.move_to(Position::Cell(cell));
            records.push(PersistRecord::equip_change(
                occupant.as_str(),
                false,
                None,
                self.grid.cell_to_index(cell),
            ));
            unequipped = Some(TransferEvent::ItemUnequipped { item: occupant, cell });
        }

        let item = self.entity(name)?.clone();
        self.slots.place(slot, &item)?;
        self.entity_mut(name)?.move_to(Position::Slot(slot));

        self.events.publish(TransferEvent::ItemEquipped {
            item: name.to_string(),
            slot,
        });
        if let Some(event) = unequipped {
            self.events.publish(event);
        }

        Ok(TransferOutcome::Committed(records))
    }

    fn apply_unequip(&mut self, name: &str, target: Cell) -> TransferResult<TransferOutcome> {
        let position = self.entity(name)?.current_position;
        let slot = match position {
            Position::Slot(slot) => slot,
            _ => return self.apply_move(name, target),
        };

        let occupant = match self.grid.occupant(target) {
            Some(occupant) => occupant.clone(),
            None => return Ok(TransferOutcome::Rejected(Rejection::OutsideGrid(target))),
        };
        let to_index = self.grid.cell_to_index(target);

        match occupant {
            Occupant::Empty => {
                self.slots.evict(slot);
                self.grid.occupy(target, name);
                self.entity_mut(name)?.move_to(Position::Cell(target));
                self.events.publish(TransferEvent::ItemUnequipped {
                    item: name.to_string(),
                    cell: target,
                });

                Ok(TransferOutcome::Committed(vec![PersistRecord::equip_change(
                    name, false, None, to_index,
                )]))
            }
            Occupant::Item(other) => {
                let other_item = self.entity(&other)?.clone();
                if !other_item.fits(slot) {
                    return Ok(TransferOutcome::Rejected(Rejection::SwapTypeMismatch {
                        occupant: other,
                        slot,
                    }));
                }

                self.slots.evict(slot);
                self.grid.occupy(target, name);
                self.slots.place(slot, &other_item)?;
                self.entity_mut(name)?.move_to(Position::Cell(target));
                self.entity_mut(&other)?.move_to(Position::Slot(slot));

                self.events.publish(TransferEvent::ItemUnequipped {
                    item: name.to_string(),
                    cell: target,
                });
                self.events.publish(TransferEvent::ItemEquipped {
                    item: other.clone(),
                    slot,
                });

                Ok(TransferOutcome::Committed(vec![
                    PersistRecord::equip_change(name, false, None, to_index),
                    PersistRecord::equip_change(other, true, to_index, None),
                ]))
            }
            Occupant::Reserved => Ok(TransferOutcome::Rejected(Rejection::BlockedCell(target))),
        }
    }

    /// Run the commit or rollback transition and return to idle
    fn finish(&mut self, name: &str, outcome: TransferOutcome) -> TransferOutcome {
        match &outcome {
            TransferOutcome::Committed(records) => {
                self.gesture = GestureState::Committing;
                log::debug!(
                    "{:?}: {} ({} record(s))",
                    self.gesture,
                    name,
                    records.len()
                );
                self.sink.submit(records.clone());
            }
            TransferOutcome::Rejected(reason) => {
                self.gesture = GestureState::RollingBack;
                let return_to = self
                    .items
                    .get(name)
                    .map(|item| item.current_position)
                    .unwrap_or(Position::Unplaced);
                log::info!(
                    "{:?}: {} rejected ({:?}), returning to {}",
                    self.gesture,
                    name,
                    reason,
                    return_to
                );
                // Views snap the item back before drawing anything else
                self.events.publish_with_priority(
                    TransferEvent::GestureRejected {
                        item: name.to_string(),
                        return_to,
                    },
                    Priority::High,
                );
            }
            TransferOutcome::Noop => {}
        }

        self.gesture = GestureState::Idle;
        self.events.process();
        outcome
    }
}

/// Translate a position from the previous shape to the current one by index
fn reindex(position: Position, old_cols: usize, grid: &GridAllocator) -> Position {
    match position {
        Position::Cell(cell) => grid
            .index_to_cell(cell.row * old_cols + cell.col)
            .map(Position::Cell)
            .unwrap_or(Position::Unplaced),
        other => other,
    }
}
