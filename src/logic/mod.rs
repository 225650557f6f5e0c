pub mod reconstruct;
pub mod win;

pub use reconstruct::{reconstruct, Replayed};
pub use win::{
    for_each_line, line_of, result_after, terminal_state, winning_cells, GameResult, Terminal,
    WinnerTag, CONNECT_N,
};
