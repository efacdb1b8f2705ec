//! Initial load from store records

use std::collections::BTreeSet;

use gear_grid::GridLayout;
use gear_sync::{BatchSink, PersistRecord};

use crate::item::{ItemEntity, ItemRecord, Position};
use crate::transfer::{TransferEngine, TransferError, TransferResult};

/// Where each loaded item ended up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Restored into their slot
    pub equipped: Vec<String>,
    /// Restored at their saved index
    pub restored: Vec<String>,
    /// Given the first free cell and written back
    pub assigned: Vec<String>,
    /// No free cell; left unplaced
    pub overflow: Vec<String>,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.equipped.len() + self.restored.len() + self.assigned.len() + self.overflow.len()
    }
}

impl TransferEngine {
    /// Build an engine and load its items in one go
    pub fn from_records(
        layout: GridLayout,
        records: Vec<ItemRecord>,
        sink: Box<dyn BatchSink>,
    ) -> TransferResult<(Self, LoadReport)> {
        let mut engine = Self::new(layout, sink)?;
        let report = engine.load(records)?;
        Ok((engine, report))
    }

    /// Place items from the store.
    ///
    /// Equipped items go first, then items with a saved index, then the
    /// rest in record order at the first free cell. A record that cannot
    /// go where it was saved joins the last group. Each item placed in the
    /// last group is written back immediately.
    pub fn load(&mut self, records: Vec<ItemRecord>) -> TransferResult<LoadReport> {
        let mut names = BTreeSet::new();
        for record in &records {
            if self.items.contains_key(&record.name) || !names.insert(record.name.as_str()) {
                return Err(TransferError::DuplicateItem(record.name.clone()));
            }
        }

        for record in &records {
            self.items
                .insert(record.name.clone(), ItemEntity::from_record(record));
        }

        let mut report = LoadReport::default();
        let mut queue = Vec::new();

        for (i, record) in records.iter().enumerate().filter(|(_, r)| r.equipped) {
            let free_slot = record.slot.filter(|slot| !self.slots.is_occupied(*slot));
            let (Some(slot), Some(item)) = (free_slot, self.items.get_mut(&record.name)) else {
                log::warn!("{} was saved as equipped but cannot be, unequipping", record.name);
                queue.push(i);
                continue;
            };

            self.slots.place(slot, item)?;
            item.place_at(Position::Slot(slot));
            report.equipped.push(record.name.clone());
        }

        for (i, record) in records.iter().enumerate().filter(|(_, r)| !r.equipped) {
            let Some(index) = record.current_space_index else {
                queue.push(i);
                continue;
            };

            let free_cell = self
                .grid
                .index_to_cell(index)
                .filter(|cell| self.grid.is_empty(*cell));
            let (Some(cell), Some(item)) = (free_cell, self.items.get_mut(&record.name)) else {
                log::warn!("Saved index {} of {} is not free, reassigning", index, record.name);
                queue.push(i);
                continue;
            };

            self.grid.occupy(cell, record.name.as_str());
            item.place_at(Position::Cell(cell));
            report.restored.push(record.name.clone());
        }

        queue.sort_unstable();
        for i in queue {
            let record = &records[i];
            let Some(cell) = self.grid.next_free_cell() else {
                log::warn!("No inventory space for {}", record.name);
                report.overflow.push(record.name.clone());
                continue;
            };

            self.grid.occupy(cell, record.name.as_str());
            if let Some(item) = self.items.get_mut(&record.name) {
                item.move_to(Position::Cell(cell));
            }

            let index = self.grid.cell_to_index(cell);
            let write = if record.equipped {
                PersistRecord::equip_change(record.name.as_str(), false, None, index)
            } else {
                PersistRecord::moved(record.name.as_str(), record.current_space_index, index)
            };
            self.sink.submit(vec![write]);
            report.assigned.push(record.name.clone());
        }

        log::info!(
            "Loaded {} item(s): {} equipped, {} restored, {} assigned, {} without space",
            report.total(),
            report.equipped.len(),
            report.restored.len(),
            report.assigned.len(),
            report.overflow.len()
        );

        Ok(report)
    }
}
