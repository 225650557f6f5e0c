use crate::core::{Cell, Grid, Player, Position};
use serde::{Deserialize, Serialize};

/// Tokens in a row needed to win.
pub const CONNECT_N: usize = 4;

/// Scan directions in tie-break order: row, column, down-right diagonal, down-left diagonal.
pub const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Outcome of a game as derived from the grid and log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GameResult {
    #[default]
    InProgress,
    Win {
        player: Player,
        cells: Vec<Position>,
    },
    Draw,
}

impl GameResult {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameResult::InProgress)
    }

    pub fn winner(&self) -> Option<Player> {
        match self {
            GameResult::Win { player, .. } => Some(*player),
            _ => None,
        }
    }

    pub fn winning_cells(&self) -> &[Position] {
        match self {
            GameResult::Win { cells, .. } => cells,
            _ => &[],
        }
    }

    pub fn winner_tag(&self) -> Option<WinnerTag> {
        match self {
            GameResult::InProgress => None,
            GameResult::Win { player, .. } => Some(WinnerTag::from(*player)),
            GameResult::Draw => Some(WinnerTag::Draw),
        }
    }
}

/// Compact winner marker used in stored and remote documents: "A", "B" or "D".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerTag {
    #[serde(alias = "R")]
    A,
    #[serde(alias = "Y")]
    B,
    #[serde(rename = "D")]
    Draw,
}

impl From<Player> for WinnerTag {
    fn from(player: Player) -> Self {
        match player {
            Player::A => WinnerTag::A,
            Player::B => WinnerTag::B,
        }
    }
}

impl WinnerTag {
    pub fn player(self) -> Option<Player> {
        match self {
            WinnerTag::A => Some(Player::A),
            WinnerTag::B => Some(Player::B),
            WinnerTag::Draw => None,
        }
    }
}

/// Full-board verdict, used where the last placement is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    InProgress,
    Win(Player),
    Draw,
}

fn step(grid: &Grid, pos: Position, (dr, dc): (isize, isize)) -> Option<Position> {
    let row = pos.row.checked_add_signed(dr)?;
    let col = pos.col.checked_add_signed(dc)?;
    (row < grid.rows() && col < grid.cols()).then(|| Position::new(row, col))
}

/// Winning cells through `pos` for `player`, or empty.
///
/// Runs are collected in board order (the negative end first) and cut to the
/// first [`CONNECT_N`] cells, so a five-in-a-row still reports four cells.
pub fn winning_cells(grid: &Grid, pos: Position, player: Player) -> Vec<Position> {
    let token = player.cell();
    if grid.at(pos) != token {
        return Vec::new();
    }

    for (dr, dc) in DIRECTIONS {
        let mut run = vec![pos];

        let mut cur = pos;
        while let Some(next) = step(grid, cur, (-dr, -dc)) {
            if grid.at(next) != token {
                break;
            }
            run.insert(0, next);
            cur = next;
        }

        let mut cur = pos;
        while let Some(next) = step(grid, cur, (dr, dc)) {
            if grid.at(next) != token {
                break;
            }
            run.push(next);
            cur = next;
        }

        if run.len() >= CONNECT_N {
            run.truncate(CONNECT_N);
            return run;
        }
    }

    Vec::new()
}

/// Result of the placement at `pos` by `player` on an otherwise settled grid.
pub fn result_after(grid: &Grid, pos: Position, player: Player) -> GameResult {
    let cells = winning_cells(grid, pos, player);
    if !cells.is_empty() {
        GameResult::Win { player, cells }
    } else if grid.is_full() {
        GameResult::Draw
    } else {
        GameResult::InProgress
    }
}

/// Calls `f` with the cells of every length-[`CONNECT_N`] line on the board:
/// rows, columns, down-right and up-right diagonals.
pub fn for_each_line<F>(grid: &Grid, mut f: F)
where
    F: FnMut(&[Cell; CONNECT_N]),
{
    let (rows, cols) = (grid.rows(), grid.cols());
    let n = CONNECT_N;
    let mut window = [Cell::Empty; CONNECT_N];

    if cols >= n {
        for r in 0..rows {
            for c in 0..=cols - n {
                for (i, w) in window.iter_mut().enumerate() {
                    *w = grid.get(r, c + i);
                }
                f(&window);
            }
        }
    }
    if rows >= n {
        for c in 0..cols {
            for r in 0..=rows - n {
                for (i, w) in window.iter_mut().enumerate() {
                    *w = grid.get(r + i, c);
                }
                f(&window);
            }
        }
    }
    if rows >= n && cols >= n {
        for r in 0..=rows - n {
            for c in 0..=cols - n {
                for (i, w) in window.iter_mut().enumerate() {
                    *w = grid.get(r + i, c + i);
                }
                f(&window);
            }
        }
        for r in n - 1..rows {
            for c in 0..=cols - n {
                for (i, w) in window.iter_mut().enumerate() {
                    *w = grid.get(r - i, c + i);
                }
                f(&window);
            }
        }
    }
}

fn has_line(grid: &Grid, player: Player) -> bool {
    let token = player.cell();
    let mut found = false;
    for_each_line(grid, |w| {
        if !found && w.iter().all(|&c| c == token) {
            found = true;
        }
    });
    found
}

/// First winning line of `player` anywhere on the board, in row-major order
/// of the cells it passes through, or empty.
pub fn line_of(grid: &Grid, player: Player) -> Vec<Position> {
    (0..grid.rows())
        .flat_map(|row| (0..grid.cols()).map(move |col| Position::new(row, col)))
        .map(|pos| winning_cells(grid, pos, player))
        .find(|cells| !cells.is_empty())
        .unwrap_or_default()
}

/// Scans every board line; A is checked before B.
pub fn terminal_state(grid: &Grid) -> Terminal {
    if has_line(grid, Player::A) {
        Terminal::Win(Player::A)
    } else if has_line(grid, Player::B) {
        Terminal::Win(Player::B)
    } else if grid.is_full() {
        Terminal::Draw
    } else {
        Terminal::InProgress
    }
}
