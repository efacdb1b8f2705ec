//! Gear Grid - Inventory Occupancy
//!
//! This crate tracks which item sits in which cell of a rows × cols
//! inventory grid.
//!
//! # Features
//!
//! - Composite `(row, col)` cell keys, ordered row-major
//! - Stable index form of every cell for persistence
//! - Deterministic free-cell search
//! - Reserved (blocked) padding cells
//! - Index-preserving remap when the grid changes shape
//!
//! # Example
//!
//! ```
//! use gear_grid::prelude::*;
//!
//! let layout = GridLayout::new(9, Orientation::Horizontal);
//! let mut grid = layout.build().unwrap();
//!
//! let cell = grid.next_free_cell().unwrap();
//! grid.occupy(cell, "sword");
//! assert_eq!(grid.cell_to_index(cell), Some(0));
//!
//! // 9 slots display as 2×5, the tenth cell is blocked.
//! assert_eq!(grid.reserved_count(), 1);
//! ```

pub mod allocator;
pub mod layout;

pub mod prelude {
    pub use crate::allocator::{Cell, GridAllocator, GridError, Occupant};
    pub use crate::layout::{GridLayout, Orientation};
}

pub use prelude::*;
