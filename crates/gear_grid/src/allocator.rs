//! Grid allocator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Grid errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// Rows or columns were zero
    #[error("Invalid grid shape: {rows}x{cols}")]
    InvalidShape { rows: usize, cols: usize },
}

/// A cell in the current grid shape.
///
/// Ordering is row-major, which is also the order used to derive indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    /// Create a cell
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// What a cell holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occupant {
    /// Nothing
    Empty,
    /// An item, by name
    Item(String),
    /// Padding that can never be a move target
    Reserved,
}

impl Occupant {
    /// Whether the cell is free
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Item name if the cell holds one
    pub fn item(&self) -> Option<&str> {
        match self {
            Self::Item(name) => Some(name),
            _ => None,
        }
    }
}

impl Default for Occupant {
    fn default() -> Self {
        Self::Empty
    }
}

/// Occupancy map over a rows × cols grid
#[derive(Debug, Clone)]
pub struct GridAllocator {
    rows: usize,
    cols: usize,
    /// One entry per cell of the current shape
    spaces: BTreeMap<Cell, Occupant>,
    /// Occupancy before the most recent `build`
    old_spaces: BTreeMap<Cell, Occupant>,
}

impl GridAllocator {
    /// Create an empty grid
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridError> {
        let mut grid = Self {
            rows: 0,
            cols: 0,
            spaces: BTreeMap::new(),
            old_spaces: BTreeMap::new(),
        };
        grid.build(rows, cols)?;
        Ok(grid)
    }

    /// Reinitialize to an empty rows × cols grid.
    ///
    /// The previous occupancy is kept in `old_spaces`. On error nothing changes.
    pub fn build(&mut self, rows: usize, cols: usize) -> Result<(), GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidShape { rows, cols });
        }

        self.old_spaces = std::mem::take(&mut self.spaces);
        self.rows = rows;
        self.cols = cols;

        for row in 0..rows {
            for col in 0..cols {
                self.spaces.insert(Cell::new(row, col), Occupant::Empty);
            }
        }

        Ok(())
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the cell is part of the current shape
    pub fn contains(&self, cell: Cell) -> bool {
        self.spaces.contains_key(&cell)
    }

    /// Position of `cell` in row-major order, `None` outside the shape
    pub fn cell_to_index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.row * self.cols + cell.col)
        } else {
            None
        }
    }

    /// Inverse of [`cell_to_index`](Self::cell_to_index)
    pub fn index_to_cell(&self, index: usize) -> Option<Cell> {
        if index < self.capacity() {
            Some(Cell::new(index / self.cols, index % self.cols))
        } else {
            None
        }
    }

    /// Get the occupant of a cell
    pub fn occupant(&self, cell: Cell) -> Option<&Occupant> {
        self.spaces.get(&cell)
    }

    /// Check if a cell exists and is free
    pub fn is_empty(&self, cell: Cell) -> bool {
        self.spaces.get(&cell).map(Occupant::is_empty).unwrap_or(false)
    }

    /// Check if a cell is reserved padding
    pub fn is_reserved(&self, cell: Cell) -> bool {
        matches!(self.spaces.get(&cell), Some(Occupant::Reserved))
    }

    /// Put an item in a cell, overwriting whatever was there.
    ///
    /// Returns false if the cell is outside the shape.
    pub fn occupy(&mut self, cell: Cell, item: impl Into<String>) -> bool {
        match self.spaces.get_mut(&cell) {
            Some(slot) => {
                *slot = Occupant::Item(item.into());
                true
            }
            None => false,
        }
    }

    /// Block a cell permanently
    pub fn reserve(&mut self, cell: Cell) -> bool {
        match self.spaces.get_mut(&cell) {
            Some(slot) => {
                *slot = Occupant::Reserved;
                true
            }
            None => false,
        }
    }

    /// Mark a cell empty
    pub fn vacate(&mut self, cell: Cell) {
        if let Some(slot) = self.spaces.get_mut(&cell) {
            *slot = Occupant::Empty;
        }
    }

    /// Smallest empty cell in row-major order
    pub fn next_free_cell(&self) -> Option<Cell> {
        self.spaces
            .iter()
            .find(|(_, occupant)| occupant.is_empty())
            .map(|(cell, _)| *cell)
    }

    /// Find the cell holding an item
    pub fn locate(&self, item: &str) -> Option<Cell> {
        self.spaces
            .iter()
            .find(|(_, occupant)| occupant.item() == Some(item))
            .map(|(cell, _)| *cell)
    }

    /// Rebuild at a new shape, keeping every occupant at the same index.
    ///
    /// Returns the items whose index no longer exists; callers must re-place
    /// them. Reserved markers past the end are dropped.
    pub fn remap(&mut self, rows: usize, cols: usize) -> Result<Vec<String>, GridError> {
        self.build(rows, cols)?;

        let previous: Vec<Occupant> = self.old_spaces.values().cloned().collect();
        let mut displaced = Vec::new();

        for (index, occupant) in previous.into_iter().enumerate() {
            if occupant.is_empty() {
                continue;
            }
            match self.index_to_cell(index) {
                Some(cell) => {
                    self.spaces.insert(cell, occupant);
                }
                None => {
                    if let Occupant::Item(name) = occupant {
                        displaced.push(name);
                    }
                }
            }
        }

        if !displaced.is_empty() {
            log::warn!(
                "Remap to {}x{} left {} item(s) without a cell",
                rows,
                cols,
                displaced.len()
            );
        }

        Ok(displaced)
    }

    /// Occupancy before the last rebuild
    pub fn old_spaces(&self) -> &BTreeMap<Cell, Occupant> {
        &self.old_spaces
    }

    /// Iterate cells in index order
    pub fn cells(&self) -> impl Iterator<Item = (Cell, &Occupant)> {
        self.spaces.iter().map(|(cell, occupant)| (*cell, occupant))
    }

    /// Number of free cells
    pub fn free_count(&self) -> usize {
        self.spaces.values().filter(|o| o.is_empty()).count()
    }

    /// Number of reserved cells
    pub fn reserved_count(&self) -> usize {
        self.spaces
            .values()
            .filter(|o| matches!(o, Occupant::Reserved))
            .count()
    }

    /// Check if no cell is free
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_empty_shape() {
        assert_eq!(
            GridAllocator::new(0, 3).unwrap_err(),
            GridError::InvalidShape { rows: 0, cols: 3 }
        );
        assert!(GridAllocator::new(2, 0).is_err());

        let mut grid = GridAllocator::new(2, 2).unwrap();
        grid.occupy(Cell::new(0, 0), "sword");
        assert!(grid.build(0, 0).is_err());
        // Failed rebuild leaves the grid untouched
        assert_eq!(grid.locate("sword"), Some(Cell::new(0, 0)));
    }

    #[test]
    fn test_index_round_trip() {
        let grid = GridAllocator::new(3, 4).unwrap();

        for i in 0..grid.capacity() {
            let cell = grid.index_to_cell(i).unwrap();
            assert_eq!(grid.cell_to_index(cell), Some(i));
        }
        for (cell, _) in grid.cells() {
            let index = grid.cell_to_index(cell).unwrap();
            assert_eq!(grid.index_to_cell(index), Some(cell));
        }

        assert_eq!(grid.index_to_cell(12), None);
        assert_eq!(grid.cell_to_index(Cell::new(3, 0)), None);
        assert_eq!(grid.cell_to_index(Cell::new(0, 4)), None);
    }

    #[test]
    fn test_multi_digit_cells_do_not_collide() {
        let grid = GridAllocator::new(13, 24).unwrap();

        let a = grid.cell_to_index(Cell::new(1, 23)).unwrap();
        let b = grid.cell_to_index(Cell::new(12, 3)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, 47);
        assert_eq!(b, 291);
    }

    #[test]
    fn test_occupy_and_vacate() {
        let mut grid = GridAllocator::new(2, 2).unwrap();
        let cell = Cell::new(1, 0);

        assert!(grid.occupy(cell, "shield"));
        assert!(!grid.is_empty(cell));
        assert_eq!(grid.occupant(cell).and_then(Occupant::item), Some("shield"));

        grid.vacate(cell);
        assert!(grid.is_empty(cell));

        assert!(!grid.occupy(Cell::new(5, 5), "ghost"));
        grid.vacate(Cell::new(5, 5));
        assert!(!grid.is_empty(Cell::new(5, 5)));
    }

    #[test]
    fn test_next_free_cell() {
        let mut grid = GridAllocator::new(2, 2).unwrap();

        assert_eq!(grid.next_free_cell(), grid.index_to_cell(0));
        grid.occupy(grid.index_to_cell(0).unwrap(), "a");
        assert_eq!(grid.next_free_cell(), grid.index_to_cell(1));

        grid.reserve(Cell::new(0, 1));
        assert_eq!(grid.next_free_cell(), Some(Cell::new(1, 0)));

        grid.occupy(Cell::new(1, 0), "b");
        grid.occupy(Cell::new(1, 1), "c");
        assert_eq!(grid.next_free_cell(), None);
        assert!(grid.is_full());
    }

    #[test]
    fn test_remap_preserves_index() {
        let mut grid = GridAllocator::new(2, 5).unwrap();
        let before = grid.index_to_cell(3).unwrap();
        grid.occupy(before, "sword");
        grid.reserve(grid.index_to_cell(9).unwrap());

        let displaced = grid.remap(5, 2).unwrap();
        assert!(displaced.is_empty());

        let after = grid.locate("sword").unwrap();
        assert_eq!(grid.cell_to_index(after), Some(3));
        assert_eq!(after, Cell::new(1, 1));
        assert_ne!(before, after);
        assert!(grid.is_reserved(Cell::new(4, 1)));
        assert_eq!(grid.old_spaces().len(), 10);
    }

    #[test]
    fn test_remap_reports_displaced_items() {
        let mut grid = GridAllocator::new(2, 3).unwrap();
        grid.occupy(grid.index_to_cell(1).unwrap(), "kept");
        grid.occupy(grid.index_to_cell(5).unwrap(), "lost");

        let displaced = grid.remap(2, 2).unwrap();
        assert_eq!(displaced, vec!["lost".to_string()]);
        assert_eq!(grid.locate("kept").and_then(|c| grid.cell_to_index(c)), Some(1));
        assert_eq!(grid.locate("lost"), None);
    }
}
