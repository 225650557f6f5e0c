pub mod board;
pub mod move_log;
pub mod types;

pub use board::{center_out, Grid, DEFAULT_COLS, DEFAULT_ROWS, MAX_DIM, MIN_DIM};
pub use move_log::{player_at, MoveLog};
pub use types::{Cell, Player, Position};
