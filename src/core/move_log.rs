use super::types::Player;
use std::collections::BTreeSet;

/// Ordered record of played columns; the authoritative game history.
///
/// Whose move index `i` was is derived from the starting player alone, so no
/// separate "current player" is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveLog {
    starting: Player,
    moves: Vec<usize>,
}

impl MoveLog {
    pub fn new(starting: Player) -> Self {
        MoveLog {
            starting,
            moves: Vec::new(),
        }
    }

    pub fn from_moves(starting: Player, moves: Vec<usize>) -> Self {
        MoveLog { starting, moves }
    }

    pub fn starting_player(&self) -> Player {
        self.starting
    }

    pub fn player_at(&self, index: usize) -> Player {
        player_at(self.starting, index)
    }

    /// Player who makes the next appended move.
    pub fn next_player(&self) -> Player {
        self.player_at(self.moves.len())
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn moves(&self) -> &[usize] {
        &self.moves
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.moves.get(index).copied()
    }

    /// Appends `col` as move number `cursor`, dropping every move at or after it.
    /// Returns the index the move was written to.
    pub fn record_at(&mut self, cursor: usize, col: usize) -> usize {
        self.moves.truncate(cursor);
        self.moves.push(col);
        self.moves.len() - 1
    }

    pub fn truncate(&mut self, len: usize) {
        self.moves.truncate(len);
    }

    pub fn distinct_columns(&self) -> usize {
        self.moves.iter().collect::<BTreeSet<_>>().len()
    }
}

/// `starting` on even indices, the other player on odd ones.
pub fn player_at(starting: Player, index: usize) -> Player {
    if index % 2 == 0 {
        starting
    } else {
        starting.other()
    }
}
