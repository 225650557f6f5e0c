use crate::core::Grid;
use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform pick among the open columns, `None` on a full grid.
pub fn random_column<R: Rng + ?Sized>(grid: &Grid, rng: &mut R) -> Option<usize> {
    grid.valid_columns().choose(rng).copied()
}
