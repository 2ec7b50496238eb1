use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snake::Action;

/// A board position. Coordinates are signed so that a step off the board is
/// still representable and can be rejected by [`Grid::valid`].
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub fn new(row: i32, col: i32) -> Cell {
        Cell { row, col }
    }

    /// The cell one step away in the direction of `action`.
    pub fn moved(self, action: Action) -> Cell {
        let (dr, dc) = action.delta();
        Cell {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Fixed board geometry. Every cell in `0..height x 0..width` is playable,
/// the outermost ring included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    // row-major, built once
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Grid {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                cells.push(Cell { row, col });
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells on the board.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn valid(&self, cell: Cell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as usize) < self.height
            && (cell.col as usize) < self.width
    }

    /// Every cell in row-major order.
    pub fn all_cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Dense row-major index, `None` for cells off the board.
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if self.valid(cell) {
            Some(cell.row as usize * self.width + cell.col as usize)
        } else {
            None
        }
    }

    pub fn center(&self) -> Cell {
        Cell::new((self.height / 2) as i32, (self.width / 2) as i32)
    }

    /// The on-board neighbour of `cell` in direction `action`, if any.
    pub fn neighbor(&self, cell: Cell, action: Action) -> Option<Cell> {
        let next = cell.moved(action);
        if self.valid(next) {
            Some(next)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_covers_outer_ring() {
        let grid = Grid::new(20, 20);
        assert!(grid.valid(Cell::new(0, 0)));
        assert!(grid.valid(Cell::new(19, 19)));
        assert!(grid.valid(Cell::new(0, 5)));
        assert!(!grid.valid(Cell::new(-1, 5)));
        assert!(!grid.valid(Cell::new(5, 20)));
        assert!(!grid.valid(Cell::new(20, 0)));
    }

    #[test]
    fn test_all_cells_row_major() {
        let grid = Grid::new(3, 2);
        let cells = grid.all_cells();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], Cell::new(0, 0));
        assert_eq!(cells[2], Cell::new(0, 2));
        assert_eq!(cells[3], Cell::new(1, 0));
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(grid.index(*cell), Some(i));
        }
    }

    #[test]
    fn test_neighbor_and_center() {
        let grid = Grid::new(20, 20);
        assert_eq!(grid.center(), Cell::new(10, 10));
        assert_eq!(grid.neighbor(Cell::new(0, 5), Action::Up), None);
        assert_eq!(
            grid.neighbor(Cell::new(0, 5), Action::Down),
            Some(Cell::new(1, 5))
        );
        assert_eq!(
            grid.neighbor(Cell::new(4, 4), Action::Right),
            Some(Cell::new(4, 5))
        );
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(Cell::new(0, 0).manhattan(Cell::new(5, 7)), 12);
        assert_eq!(Cell::new(3, 3).manhattan(Cell::new(3, 3)), 0);
    }
}
