//! # Evaluation Module
//!
//! Static, perspective-relative scoring of a non-terminal grid. Scores are
//! heuristic: they rank positions for the search, they do not prove anything.
//!
//! ## Scoring Strategy
//! 1. **Center control**: a bonus per own token in the middle column (`cols / 2`).
//! 2. **Windows**: every length-4 line (rows, columns, both diagonals) is
//!    classified by its (own, opponent, empty) counts. Mixed windows are dead
//!    and score nothing; open threes and twos score for their owner, with the
//!    opponent's weighted slightly heavier so the AI prefers blocking.

use super::config::EvalWeights;
use super::evaluator::Evaluator;
use crate::core::{Cell, Grid, Player};
use crate::logic::{for_each_line, CONNECT_N};

/// Window-counting evaluator.
#[derive(Debug, Clone, Default)]
pub struct WindowEvaluator {
    pub weights: EvalWeights,
}

impl WindowEvaluator {
    pub fn new(weights: EvalWeights) -> Self {
        WindowEvaluator { weights }
    }
}

impl Evaluator for WindowEvaluator {
    fn score(&self, grid: &Grid, perspective: Player) -> i64 {
        score(grid, perspective, &self.weights)
    }

    fn name(&self) -> &str {
        "window"
    }
}

fn score_window(w: &EvalWeights, own: usize, opp: usize, empty: usize) -> i64 {
    if own > 0 && opp > 0 {
        return 0;
    }
    match (own, opp, empty) {
        (CONNECT_N, _, _) => w.four,
        (_, CONNECT_N, _) => -w.four,
        (3, 0, 1) => w.own_three,
        (2, 0, 2) => w.own_two,
        (0, 3, 1) => -w.opp_three,
        (0, 2, 2) => -w.opp_two,
        _ => 0,
    }
}

/// Scores `grid` for `perspective`.
pub fn score(grid: &Grid, perspective: Player, weights: &EvalWeights) -> i64 {
    let own_cell = perspective.cell();
    let opp_cell = perspective.other().cell();
    let mut total = 0;

    let center = grid.cols() / 2;
    for row in 0..grid.rows() {
        if grid.get(row, center) == own_cell {
            total += weights.center;
        }
    }

    for_each_line(grid, |window: &[Cell; CONNECT_N]| {
        let mut own = 0;
        let mut opp = 0;
        let mut empty = 0;
        for &c in window {
            if c == own_cell {
                own += 1;
            } else if c == opp_cell {
                opp += 1;
            } else {
                empty += 1;
            }
        }
        total += score_window(weights, own, opp, empty);
    });

    total
}
