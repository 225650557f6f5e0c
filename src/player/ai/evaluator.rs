//! Static scoring used at search leaves.

use crate::core::{Grid, Player};

pub trait Evaluator {
    /// Heuristic value of `grid` for `perspective`: positive when it stands
    /// better, negative when the opponent does.
    fn score(&self, grid: &Grid, perspective: Player) -> i64;

    /// Short label for logs.
    fn name(&self) -> &str;
}
