//! Gear Inventory - Items, Equipment and Drag Transfer
//!
//! This crate holds the per-item state, the four equipment slots and the
//! transfer engine that moves items between them and the grid.
//!
//! # Features
//!
//! - Item records parsed from the store's JSON
//! - Head, body, main-hand and off-hand slots, one item each
//! - Moves, swaps, equip and unequip with eviction
//! - Drag gestures with commit or rollback
//! - Index-preserving resize
//! - Optimistic local commits handed to a [`gear_sync::BatchSink`]
//! - A view adapter that maps pointer input onto the engine
//!
//! # Example
//!
//! ```ignore
//! use gear_inventory::prelude::*;
//!
//! let records = ItemRecord::parse_list(&json)?;
//! let (mut engine, report) = TransferEngine::from_records(
//!     GridLayout::new(9, Orientation::Horizontal),
//!     records,
//!     Box::new(sync_client),
//! )?;
//!
//! engine.begin_drag("sword")?;
//! engine.cross_boundary("sword", Crossing::TowardEquipment)?;
//! engine.end_drag("sword", DropTarget::Slot(SlotName::MainHand))?;
//! ```

pub mod equipment;
pub mod item;
pub mod loader;
pub mod transfer;
pub mod view;

pub mod prelude {
    pub use crate::equipment::{EquipError, SlotName, SlotSet};
    pub use crate::item::{Footprint, ItemEntity, ItemRecord, ItemType, Position, Rarity};
    pub use crate::loader::LoadReport;
    pub use crate::transfer::{
        Crossing, DropTarget, Gesture, GestureState, Rejection, ResizeReport, TransferEngine,
        TransferError, TransferEvent, TransferOutcome, TransferResult,
    };
    pub use crate::view::{DrawCall, RecordingSurface, RenderSurface, ViewAdapter, ViewMetrics};
    pub use gear_grid::{Cell, GridLayout, Orientation};
}

pub use prelude::*;
