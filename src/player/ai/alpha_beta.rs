use super::eval::WindowEvaluator;
use super::evaluator::Evaluator;
use super::stepper::{Progress, SearchOutcome, SearchTask};
use crate::core::{Grid, Player};
use crate::logic::{terminal_state, Terminal};

use std::cell::Cell;
use std::fmt;

/// Value of a decided game; larger than any heuristic sum.
pub const WIN_SCORE: i64 = 10_000_000;

/// Per-column entry of the public score report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnScore {
    /// Column is full, nothing to search.
    NotApplicable,
    /// Queued but not searched yet.
    Pending,
    Scored(i64),
}

impl fmt::Display for ColumnScore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnScore::NotApplicable => write!(f, "N/A"),
            ColumnScore::Pending => write!(f, "..."),
            ColumnScore::Scored(v) => write!(f, "{v}"),
        }
    }
}

/// Depth-bounded minimax with alpha-beta pruning over grid copies.
pub struct SearchEngine {
    evaluator: Box<dyn Evaluator>,
    nodes_evaluated: Cell<u64>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(Box::new(WindowEvaluator::default()))
    }
}

impl SearchEngine {
    pub fn new(evaluator: Box<dyn Evaluator>) -> Self {
        SearchEngine {
            evaluator,
            nodes_evaluated: Cell::new(0),
        }
    }

    /// Nodes visited since the last reset.
    pub fn nodes_evaluated(&self) -> u64 {
        self.nodes_evaluated.get()
    }

    pub fn reset_nodes(&self) {
        self.nodes_evaluated.set(0);
    }

    /// Minimax value of `grid` for `perspective`, `maximizing` when it is
    /// `perspective` to move. Never touches `grid`.
    pub fn evaluate(
        &self,
        grid: &Grid,
        depth: usize,
        mut alpha: i64,
        mut beta: i64,
        maximizing: bool,
        perspective: Player,
    ) -> i64 {
        self.nodes_evaluated.set(self.nodes_evaluated.get() + 1);

        match terminal_state(grid) {
            Terminal::Win(p) if p == perspective => return WIN_SCORE,
            Terminal::Win(_) => return -WIN_SCORE,
            Terminal::Draw => return 0,
            Terminal::InProgress => {}
        }
        if depth == 0 {
            return self.evaluator.score(grid, perspective);
        }

        let columns = grid.valid_columns_center_out();
        if columns.is_empty() {
            return 0;
        }

        if maximizing {
            let mut value = i64::MIN;
            for col in columns {
                let mut child = grid.clone();
                if child.drop_token(col, perspective).is_err() {
                    continue;
                }
                value =
                    value.max(self.evaluate(&child, depth - 1, alpha, beta, false, perspective));
                alpha = alpha.max(value);
                if alpha >= beta {
                    break;
                }
            }
            value
        } else {
            let mut value = i64::MAX;
            let opponent = perspective.other();
            for col in columns {
                let mut child = grid.clone();
                if child.drop_token(col, opponent).is_err() {
                    continue;
                }
                value =
                    value.min(self.evaluate(&child, depth - 1, alpha, beta, true, perspective));
                beta = beta.min(value);
                if alpha >= beta {
                    break;
                }
            }
            value
        }
    }

    /// Value of playing `col` now: the reply position searched one ply shallower
    /// with a fresh window. `None` when the column is full.
    pub fn score_column(
        &self,
        grid: &Grid,
        col: usize,
        depth: usize,
        perspective: Player,
    ) -> Option<i64> {
        let mut child = grid.clone();
        child.drop_token(col, perspective).ok()?;
        Some(self.evaluate(
            &child,
            depth.saturating_sub(1),
            i64::MIN,
            i64::MAX,
            false,
            perspective,
        ))
    }

    /// Blocking search over every column; the cooperative path runs the same
    /// [`SearchTask`] one column at a time.
    pub fn best_move(&self, grid: &Grid, depth: usize, perspective: Player) -> SearchOutcome {
        self.reset_nodes();
        let mut task = SearchTask::new(0, grid.clone(), depth, perspective);
        while task.advance(self) != Progress::Finished {}
        tracing::debug!(
            "best_move ({}) depth={depth} nodes={} -> {:?}",
            self.evaluator.name(),
            self.nodes_evaluated(),
            task.best()
        );
        task.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Plain minimax without cutoffs, for checking that pruning never changes a value.
    fn minimax_plain(
        engine: &SearchEngine,
        grid: &Grid,
        depth: usize,
        maximizing: bool,
        perspective: Player,
    ) -> i64 {
        match terminal_state(grid) {
            Terminal::Win(p) if p == perspective => return WIN_SCORE,
            Terminal::Win(_) => return -WIN_SCORE,
            Terminal::Draw => return 0,
            Terminal::InProgress => {}
        }
        if depth == 0 {
            return engine.evaluator.score(grid, perspective);
        }
        let mover = if maximizing { perspective } else { perspective.other() };
        let values = grid.valid_columns().into_iter().map(|col| {
            let mut child = grid.clone();
            child.drop_token(col, mover).unwrap();
            minimax_plain(engine, &child, depth - 1, !maximizing, perspective)
        });
        if maximizing {
            values.max().unwrap_or(0)
        } else {
            values.min().unwrap_or(0)
        }
    }

    fn play(grid: &mut Grid, start: Player, cols: &[usize]) -> Player {
        let mut p = start;
        for &c in cols {
            grid.drop_token(c, p).unwrap();
            p = p.other();
        }
        p
    }

    #[test]
    fn pruning_matches_plain_minimax() {
        let engine = SearchEngine::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..12 {
            let mut grid = Grid::new(5, 5);
            let mut mover = Player::A;
            for _ in 0..rng.gen_range(0..8) {
                let valid = grid.valid_columns();
                let col = valid[rng.gen_range(0..valid.len())];
                grid.drop_token(col, mover).unwrap();
                mover = mover.other();
                if terminal_state(&grid) != Terminal::InProgress {
                    break;
                }
            }
            for depth in 1..=3 {
                for maximizing in [true, false] {
                    let pruned =
                        engine.evaluate(&grid, depth, i64::MIN, i64::MAX, maximizing, mover);
                    let plain = minimax_plain(&engine, &grid, depth, maximizing, mover);
                    assert_eq!(pruned, plain, "depth {depth} maximizing {maximizing}");
                }
            }
        }
    }

    #[test]
    fn evaluate_does_not_mutate_grid() {
        let engine = SearchEngine::default();
        let mut grid = Grid::new(6, 7);
        play(&mut grid, Player::A, &[3, 3, 2]);
        let before = grid.clone();
        engine.evaluate(&grid, 4, i64::MIN, i64::MAX, true, Player::B);
        assert_eq!(grid, before);
    }

    #[test]
    fn terminal_values() {
        let engine = SearchEngine::default();
        let mut grid = Grid::new(6, 7);
        for _ in 0..4 {
            grid.drop_token(0, Player::A).unwrap();
        }
        assert_eq!(engine.evaluate(&grid, 3, i64::MIN, i64::MAX, true, Player::A), WIN_SCORE);
        assert_eq!(engine.evaluate(&grid, 3, i64::MIN, i64::MAX, true, Player::B), -WIN_SCORE);
    }

    #[test]
    fn takes_winning_move() {
        let engine = SearchEngine::default();
        let mut grid = Grid::new(6, 7);
        let to_move = play(&mut grid, Player::A, &[0, 0, 1, 1, 2, 2]);
        assert_eq!(to_move, Player::A);
        let outcome = engine.best_move(&grid, 4, Player::A);
        assert_eq!(outcome.column, Some(3));
        assert_eq!(outcome.scores[3], ColumnScore::Scored(WIN_SCORE));
    }

    #[test]
    fn blocks_opponent_win() {
        let engine = SearchEngine::default();
        let mut grid = Grid::new(6, 7);
        let to_move = play(&mut grid, Player::A, &[6, 0, 6, 1, 5, 2]);
        assert_eq!(to_move, Player::A);
        let outcome = engine.best_move(&grid, 4, Player::A);
        assert_eq!(outcome.column, Some(3));
    }

    #[test]
    fn empty_board_prefers_center_on_ties() {
        let engine = SearchEngine::default();
        let grid = Grid::new(6, 7);
        let outcome = engine.best_move(&grid, 1, Player::A);
        assert_eq!(outcome.column, Some(3));
        assert!(outcome
            .scores
            .iter()
            .all(|s| matches!(s, ColumnScore::Scored(_))));
    }

    #[test]
    fn full_columns_are_not_applicable() {
        let engine = SearchEngine::default();
        let mut grid = Grid::new(4, 5);
        play(&mut grid, Player::A, &[0, 0, 0, 0]);
        let outcome = engine.best_move(&grid, 2, Player::B);
        assert_eq!(outcome.scores[0], ColumnScore::NotApplicable);
        assert_ne!(outcome.column, Some(0));
        assert!(engine.nodes_evaluated() > 0);
    }

    #[test]
    fn score_display() {
        assert_eq!(ColumnScore::NotApplicable.to_string(), "N/A");
        assert_eq!(ColumnScore::Pending.to_string(), "...");
        assert_eq!(ColumnScore::Scored(-35).to_string(), "-35");
    }
}
