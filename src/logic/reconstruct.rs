use super::win::{line_of, result_after, terminal_state, GameResult, Terminal};
use crate::core::{player_at, Grid, Player, Position};

/// A grid materialized from a move-log prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replayed {
    pub grid: Grid,
    /// Number of moves actually placed. Smaller than requested when a drop was rejected.
    pub applied: usize,
    /// Last placement and who made it.
    pub last: Option<(Position, Player)>,
}

impl Replayed {
    /// Result of the replayed position. The last placement is checked first;
    /// when it decides nothing the whole board is scanned, since a loaded or
    /// remote log may carry a line completed before its final move.
    pub fn result(&self) -> GameResult {
        if let Some((pos, player)) = self.last {
            if let win @ GameResult::Win { .. } = result_after(&self.grid, pos, player) {
                return win;
            }
        }
        match self.terminal() {
            Terminal::InProgress => GameResult::InProgress,
            Terminal::Draw => GameResult::Draw,
            Terminal::Win(player) => GameResult::Win {
                player,
                cells: line_of(&self.grid, player),
            },
        }
    }

    /// Full-board verdict, for states whose history is not trusted.
    pub fn terminal(&self) -> Terminal {
        terminal_state(&self.grid)
    }
}

/// Replays `min(up_to, moves.len())` moves onto an empty `rows x cols` grid.
/// Stops at the first rejected drop.
pub fn reconstruct(
    rows: usize,
    cols: usize,
    moves: &[usize],
    up_to: usize,
    starting: Player,
) -> Replayed {
    let mut grid = Grid::new(rows, cols);
    let mut last = None;
    let mut applied = 0;

    for (i, &col) in moves.iter().take(up_to).enumerate() {
        let player = player_at(starting, i);
        match grid.drop_token(col, player) {
            Ok(pos) => {
                last = Some((pos, player));
                applied += 1;
            }
            Err(e) => {
                tracing::debug!("replay stopped at move #{i}: {e}");
                break;
            }
        }
    }

    Replayed {
        grid,
        applied,
        last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Cell;

    #[test]
    fn replays_prefix_only() {
        let r = reconstruct(6, 7, &[3, 3, 4], 2, Player::A);
        assert_eq!(r.applied, 2);
        assert_eq!(r.grid.get(5, 3), Cell::Token(Player::A));
        assert_eq!(r.grid.get(4, 3), Cell::Token(Player::B));
        assert_eq!(r.grid.get(5, 4), Cell::Empty);
        assert_eq!(r.last, Some((Position::new(4, 3), Player::B)));
    }

    #[test]
    fn up_to_beyond_log_is_clamped() {
        let r = reconstruct(6, 7, &[0, 1], 10, Player::B);
        assert_eq!(r.applied, 2);
        assert_eq!(r.grid.get(5, 0), Cell::Token(Player::B));
        assert_eq!(r.grid.get(5, 1), Cell::Token(Player::A));
    }

    #[test]
    fn stops_at_rejected_drop() {
        // Fifth drop into a 4-row column is rejected; the later move is never placed.
        let r = reconstruct(4, 4, &[0, 0, 0, 0, 0, 1], 6, Player::A);
        assert_eq!(r.applied, 4);
        assert_eq!(r.grid.get(3, 1), Cell::Empty);

        let r = reconstruct(4, 4, &[2, 9, 1], 3, Player::A);
        assert_eq!(r.applied, 1);
    }

    #[test]
    fn result_from_last_placement() {
        let r = reconstruct(6, 7, &[0, 0, 1, 1, 2, 2, 3], 7, Player::A);
        assert_eq!(r.result().winner(), Some(Player::A));
        assert_eq!(r.terminal(), Terminal::Win(Player::A));

        let r = reconstruct(6, 7, &[0, 0, 1, 1, 2, 2, 3], 6, Player::A);
        assert_eq!(r.result(), GameResult::InProgress);
    }

    #[test]
    fn line_completed_before_the_last_move_still_wins() {
        let r = reconstruct(6, 7, &[0, 0, 1, 1, 2, 2, 3, 4], 8, Player::A);
        assert_eq!(r.last, Some((Position::new(5, 4), Player::B)));
        assert_eq!(
            r.result(),
            GameResult::Win {
                player: Player::A,
                cells: (0..4).map(|c| Position::new(5, c)).collect(),
            }
        );
    }

    #[test]
    fn empty_log_is_in_progress() {
        assert_eq!(reconstruct(6, 7, &[], 0, Player::A).result(), GameResult::InProgress);
    }
}
