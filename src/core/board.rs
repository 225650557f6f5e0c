use super::types::{Cell, Player, Position};
use crate::error::MoveError;

pub const DEFAULT_ROWS: usize = 8;
pub const DEFAULT_COLS: usize = 9;
/// Smallest and largest accepted board dimension.
pub const MIN_DIM: usize = 4;
pub const MAX_DIM: usize = 20;

/// Fixed-size cell matrix with gravity drops.
///
/// Cells are only ever written through [`Grid::drop_token`], so a column never
/// has an empty cell below a filled one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        debug_assert!(rows > 0 && cols > 0);
        Grid {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row * self.cols + col]
    }

    pub fn at(&self, pos: Position) -> Cell {
        self.get(pos.row, pos.col)
    }

    pub fn is_column_full(&self, col: usize) -> bool {
        col >= self.cols || !self.get(0, col).is_empty()
    }

    /// Drops `player`'s token into `col`; returns where it landed.
    pub fn drop_token(&mut self, col: usize, player: Player) -> Result<Position, MoveError> {
        if col >= self.cols {
            return Err(MoveError::OutOfRange {
                col,
                cols: self.cols,
            });
        }
        if self.is_column_full(col) {
            return Err(MoveError::ColumnFull(col));
        }

        for row in (0..self.rows).rev() {
            let idx = row * self.cols + col;
            if self.cells[idx].is_empty() {
                self.cells[idx] = player.cell();
                return Ok(Position::new(row, col));
            }
        }

        unreachable!("top cell empty but no empty cell in column {col}");
    }

    /// Not-full columns, ascending.
    pub fn valid_columns(&self) -> Vec<usize> {
        (0..self.cols).filter(|&c| !self.is_column_full(c)).collect()
    }

    /// Not-full columns, nearest to the center first.
    pub fn valid_columns_center_out(&self) -> Vec<usize> {
        center_out(self.cols)
            .into_iter()
            .filter(|&c| !self.is_column_full(c))
            .collect()
    }

    pub fn is_full(&self) -> bool {
        (0..self.cols).all(|c| self.is_column_full(c))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// All column indices ordered by distance from `cols / 2`; equal distances keep
/// the left column first.
pub fn center_out(cols: usize) -> Vec<usize> {
    let center = cols / 2;
    let mut order: Vec<usize> = (0..cols).collect();
    order.sort_by_key(|&c| c.abs_diff(center));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_lands_at_bottom_then_stacks() {
        let mut grid = Grid::new(6, 7);
        assert_eq!(grid.drop_token(3, Player::A).unwrap(), Position::new(5, 3));
        assert_eq!(grid.drop_token(3, Player::B).unwrap(), Position::new(4, 3));
        assert_eq!(grid.get(5, 3), Cell::Token(Player::A));
        assert_eq!(grid.get(4, 3), Cell::Token(Player::B));
    }

    #[test]
    fn fifth_drop_lands_at_rows_minus_five() {
        let mut grid = Grid::new(6, 7);
        let mut player = Player::A;
        let mut last = Position::default();
        for _ in 0..5 {
            last = grid.drop_token(0, player).unwrap();
            player = player.other();
        }
        assert_eq!(last.row, 6 - 1 - 4);

        grid.drop_token(0, player).unwrap();
        assert!(grid.is_column_full(0));
        assert_eq!(grid.drop_token(0, Player::A), Err(MoveError::ColumnFull(0)));
    }

    #[test]
    fn rejected_drop_leaves_grid_unchanged() {
        let mut grid = Grid::new(4, 4);
        for _ in 0..4 {
            grid.drop_token(1, Player::B).unwrap();
        }
        let before = grid.clone();
        assert!(grid.drop_token(1, Player::A).is_err());
        assert!(grid.drop_token(4, Player::A).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn out_of_range_column() {
        let mut grid = Grid::new(6, 7);
        assert_eq!(
            grid.drop_token(7, Player::A),
            Err(MoveError::OutOfRange { col: 7, cols: 7 })
        );
    }

    #[test]
    fn valid_columns_skip_full_ones() {
        let mut grid = Grid::new(4, 5);
        for _ in 0..4 {
            grid.drop_token(2, Player::A).unwrap();
        }
        assert_eq!(grid.valid_columns(), vec![0, 1, 3, 4]);
        assert_eq!(grid.valid_columns_center_out(), vec![1, 3, 0, 4]);
    }

    #[test]
    fn full_board() {
        let mut grid = Grid::new(4, 4);
        for col in 0..4 {
            for _ in 0..4 {
                grid.drop_token(col, Player::A).unwrap();
            }
        }
        assert!(grid.is_full());
        assert!(grid.valid_columns().is_empty());
    }

    #[test]
    fn center_out_order() {
        assert_eq!(center_out(7), vec![3, 2, 4, 1, 5, 0, 6]);
        assert_eq!(center_out(9), vec![4, 3, 5, 2, 6, 1, 7, 0, 8]);
        assert_eq!(center_out(4), vec![2, 1, 3, 0]);
    }
}
