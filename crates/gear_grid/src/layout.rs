//! Display layout
//!
//! Inventories are drawn as two rows (or two columns on narrow screens), so
//! an odd inventory size is padded by one reserved cell.

use crate::allocator::{Cell, GridAllocator, GridError, Occupant};
use serde::{Deserialize, Serialize};

/// Which way the grid is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Two rows
    Horizontal,
    /// Two columns
    Vertical,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::Horizontal
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => write!(f, "horizontal"),
            Self::Vertical => write!(f, "vertical"),
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "wide" | "h" => Ok(Self::Horizontal),
            "vertical" | "narrow" | "v" => Ok(Self::Vertical),
            _ => Err(format!("Unknown orientation: {}", s)),
        }
    }
}

/// Shape of the grid for a given inventory size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Number of usable cells
    pub size: usize,
    pub orientation: Orientation,
}

impl GridLayout {
    pub fn new(size: usize, orientation: Orientation) -> Self {
        Self { size, orientation }
    }

    /// Same size, other orientation
    pub fn with_orientation(self, orientation: Orientation) -> Self {
        Self { orientation, ..self }
    }

    /// Size rounded up to even
    pub fn display_size(&self) -> usize {
        self.size + self.size % 2
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let long = self.display_size() / 2;
        match self.orientation {
            Orientation::Horizontal => (2, long),
            Orientation::Vertical => (long, 2),
        }
    }

    /// Cells that exist only to make the shape rectangular
    pub fn padding_cells(&self) -> Vec<Cell> {
        let (_, cols) = self.shape();
        if cols == 0 {
            return Vec::new();
        }
        (self.size..self.display_size())
            .map(|index| Cell::new(index / cols, index % cols))
            .collect()
    }

    /// Create a fresh allocator with padding reserved
    pub fn build(&self) -> Result<GridAllocator, GridError> {
        let (rows, cols) = self.shape();
        let mut grid = GridAllocator::new(rows, cols)?;
        self.reserve_padding(&mut grid);
        Ok(grid)
    }

    /// Reserve the padding cells of an allocator already at this shape.
    ///
    /// A padding cell holding an item is left alone.
    pub fn reserve_padding(&self, grid: &mut GridAllocator) {
        for cell in self.padding_cells() {
            match grid.occupant(cell) {
                Some(Occupant::Empty) => {
                    grid.reserve(cell);
                }
                Some(Occupant::Item(name)) => {
                    log::warn!("Padding cell {} holds {}, not reserving", cell, name);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_size_has_no_padding() {
        let layout = GridLayout::new(8, Orientation::Horizontal);
        assert_eq!(layout.display_size(), 8);
        assert_eq!(layout.shape(), (2, 4));
        assert!(layout.padding_cells().is_empty());

        let grid = layout.build().unwrap();
        assert_eq!(grid.reserved_count(), 0);
        assert_eq!(grid.free_count(), 8);
    }

    #[test]
    fn test_odd_size_pads_last_cell() {
        let layout = GridLayout::new(9, Orientation::Horizontal);
        assert_eq!(layout.shape(), (2, 5));
        assert_eq!(layout.padding_cells(), vec![Cell::new(1, 4)]);

        let vertical = layout.with_orientation(Orientation::Vertical);
        assert_eq!(vertical.shape(), (5, 2));
        assert_eq!(vertical.padding_cells(), vec![Cell::new(4, 1)]);

        let grid = vertical.build().unwrap();
        assert!(grid.is_reserved(Cell::new(4, 1)));
        assert_eq!(grid.free_count(), 9);
    }

    #[test]
    fn test_zero_size_is_invalid() {
        let layout = GridLayout::new(0, Orientation::Horizontal);
        assert!(matches!(layout.build(), Err(GridError::InvalidShape { .. })));
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!("Vertical".parse::<Orientation>(), Ok(Orientation::Vertical));
        assert_eq!("h".parse::<Orientation>(), Ok(Orientation::Horizontal));
        assert!("diagonal".parse::<Orientation>().is_err());
    }
}
